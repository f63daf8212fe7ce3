//! Image input node: loads a still image into a GPU texture and draws it
//! over the forwarded target.

use std::path::PathBuf;
use std::sync::Arc;

use crate::define_properties;
use crate::errors::Result;
use crate::gfx::GpuContext;
use crate::graph::{
    EvaluationStrategy, Node, NodeArena, NodeContext, NodeKind, PortKind, Ports,
};
use crate::properties::{PropertyNotifier, PropertyRecord};
use crate::render::{ForwardDesc, RenderProbe};

use super::common::{begin_pass, create_filter_pipeline, default_info, node_boilerplate};

define_properties! {
    /// Properties of the image input.
    pub struct ImageInputProps {
        image_path: Path = PathBuf::new(),
    }
}

struct LoadedImage {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// Still-image source. Reloads when `image_path` changes; a missing or
/// undecodable file clears the property and the node evaluates to a skip.
pub struct ImageInput {
    gfx: Arc<GpuContext>,
    info: String,
    ports: Ports,
    props: ImageInputProps,
    notifier: Option<PropertyNotifier>,
    pipeline: wgpu::RenderPipeline,
    loaded_path: PathBuf,
    image: Option<LoadedImage>,
}

impl ImageInput {
    pub const TYPE_NAME: &'static str = "ImageInput";

    pub fn create(ctx: &NodeContext, properties: &str) -> Result<Box<dyn Node>> {
        let gfx = Arc::clone(ctx.require_gfx()?);
        let pipeline = create_filter_pipeline(
            &gfx,
            "ImageInput Pipeline",
            include_str!("shaders/blit.wgsl"),
            &[&gfx.layouts.texture],
            None,
        );

        let mut props = ImageInputProps::default();
        props.deserialize(properties, false, None);

        Ok(Box::new(Self {
            gfx,
            info: default_info(Self::TYPE_NAME),
            ports: Ports::new(&[], &[PortKind::RenderTexture]),
            props,
            notifier: None,
            pipeline,
            loaded_path: PathBuf::new(),
            image: None,
        }))
    }

    fn reload(&mut self) {
        let path = self.props.image_path();
        self.loaded_path = path.clone();
        self.image = None;
        if path.as_os_str().is_empty() {
            return;
        }

        let decoded = match image::open(&path) {
            Ok(decoded) => decoded.to_rgba8(),
            Err(err) => {
                log::error!("Failed to load image {}: {err}", path.display());
                // A bad path is cleared back to the safe default.
                self.props
                    .set_image_path(PathBuf::new(), true, self.notifier.as_ref());
                self.loaded_path = PathBuf::new();
                return;
            }
        };

        let (width, height) = decoded.dimensions();
        let texture = self.gfx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("ImageInput Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.gfx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &decoded,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.image = Some(LoadedImage { texture, view });
    }
}

impl Node for ImageInput {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn node_kind(&self) -> NodeKind {
        NodeKind::Input
    }

    fn evaluation_strategy(&self) -> EvaluationStrategy {
        EvaluationStrategy::Static
    }

    node_boilerplate!();

    fn update(&mut self) {
        if self.props.image_path() != self.loaded_path {
            self.reload();
        }
    }

    fn evaluate(
        &mut self,
        _arena: &NodeArena,
        probe: &mut RenderProbe<'_>,
        forward: &ForwardDesc<'_>,
    ) -> bool {
        let Some(image) = &self.image else {
            return false;
        };

        let table = probe.binding.bind_texture(&self.gfx, &image.view);
        let mut pass = begin_pass(
            &mut probe.encoder,
            "ImageInput Pass",
            forward.target,
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
        );
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &table, &[]);
        pass.set_viewport(
            0.0,
            0.0,
            forward.output_size.0 as f32,
            forward.output_size.1 as f32,
            0.0,
            1.0,
        );
        pass.draw(0..3, 0..1);
        true
    }
}
