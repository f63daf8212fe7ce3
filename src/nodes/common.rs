//! Shared node plumbing: the trait-impl boilerplate macro and fullscreen
//! pipeline construction.

use crate::gfx::{GpuContext, RENDER_FORMAT};

/// Expands the port/property/notifier forwarding methods of a [`Node`]
/// (crate::graph::Node) impl. Expects the node struct to carry `info`,
/// `ports`, `props` and `notifier` fields.
macro_rules! node_boilerplate {
    () => {
        fn info(&self) -> &str {
            &self.info
        }

        fn set_info(&mut self, info: &str) {
            self.info = format!("{}: {}", self.type_name(), info);
        }

        fn sinks(&self) -> &[crate::graph::Sink] {
            &self.ports.sinks
        }

        fn sinks_mut(&mut self) -> &mut [crate::graph::Sink] {
            &mut self.ports.sinks
        }

        fn sources(&self) -> &[crate::graph::Source] {
            &self.ports.sources
        }

        fn sources_mut(&mut self) -> &mut [crate::graph::Source] {
            &mut self.ports.sources
        }

        fn set_notifier(&mut self, notifier: crate::properties::PropertyNotifier) {
            self.notifier = Some(notifier);
        }

        fn set_property(&mut self, index: u32, value: &str, notify: bool) -> bool {
            use crate::properties::PropertyRecord;
            self.props
                .set_serialized(index, value, notify, self.notifier.as_ref())
        }

        fn set_property_value(
            &mut self,
            index: u32,
            value: &crate::properties::PropertyValue,
            notify: bool,
        ) -> bool {
            use crate::properties::PropertyRecord;
            self.props
                .set_by_index(index, value, notify, self.notifier.as_ref())
        }

        fn properties(&self) -> String {
            use crate::properties::PropertyRecord;
            self.props.serialize()
        }

        fn property_desc(&self, name: &str) -> Option<(u32, crate::properties::PropertyType)> {
            use crate::properties::PropertyRecord;
            self.props.property_desc(name)
        }
    };
}

pub(crate) use node_boilerplate;

/// Default display string of a fresh node.
pub(crate) fn default_info(type_name: &str) -> String {
    format!("{type_name}: Unnamed")
}

/// Builds a fullscreen render pipeline over the shared layouts.
///
/// `blend: None` gives opaque replacement; filters that composite pass
/// their blend state. The vertex stage is expected to synthesize its own
/// geometry from `vertex_index`.
pub(crate) fn create_fullscreen_pipeline(
    gfx: &GpuContext,
    label: &str,
    shader_source: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    blend: Option<wgpu::BlendState>,
    target_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = gfx
        .device
        .create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

    let layout = gfx
        .device
        .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts,
            push_constant_ranges: &[],
        });

    gfx.device
        .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[],
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
            cache: None,
        })
}

/// Convenience for pipelines targeting the engine's render format.
pub(crate) fn create_filter_pipeline(
    gfx: &GpuContext,
    label: &str,
    shader_source: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    blend: Option<wgpu::BlendState>,
) -> wgpu::RenderPipeline {
    create_fullscreen_pipeline(gfx, label, shader_source, bind_group_layouts, blend, RENDER_FORMAT)
}

/// Opens a render pass on `target`.
pub(crate) fn begin_pass<'a>(
    encoder: &'a mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
) -> wgpu::RenderPass<'a> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
        })],
        ..Default::default()
    })
}
