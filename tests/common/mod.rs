//! Shared test support: a manually driven master clock and mock node
//! types exercising the graph without a GPU.

#![allow(dead_code)]

use std::sync::{Mutex, OnceLock};

use glam::UVec2;
use prism::define_properties;
use prism::errors::Result;
use prism::graph::{
    EvaluationStrategy, Node, NodeArena, NodeContext, NodeKind, NodeRegistry, PortKind, Ports,
    StaticNodeInfo,
};
use prism::properties::{PropertyNotifier, PropertyRecord, PropertyType, PropertyValue};
use prism::sync::{MasterClock, Rational, INVALID_PTS};

// ============================================================================
// Manual clock
// ============================================================================

/// Master clock advanced explicitly by the test.
#[derive(Debug, Default)]
pub struct ManualClock {
    pts: u64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, pts: u64) {
        self.pts = pts;
    }
}

impl MasterClock for ManualClock {
    fn current_pts(&self) -> u64 {
        self.pts
    }

    fn reset(&mut self) {
        self.pts = 0;
    }
}

// ============================================================================
// Mock nodes
// ============================================================================

/// Presentation timestamps handed to any `TestOutput::evaluate_output`,
/// for driver-tick assertions.
pub fn evaluated_pts() -> &'static Mutex<Vec<i64>> {
    static EVALUATED: OnceLock<Mutex<Vec<i64>>> = OnceLock::new();
    EVALUATED.get_or_init(|| Mutex::new(Vec::new()))
}

define_properties! {
    pub struct TestSourceProps {
        opacity: F32 = 1.0,
        label: String = String::new(),
    }
}

define_properties! {
    pub struct TestOutputProps {
        framerate: UVec2 = UVec2::new(60, 1),
    }
}

macro_rules! test_node_boilerplate {
    () => {
        fn info(&self) -> &str {
            &self.info
        }

        fn set_info(&mut self, info: &str) {
            self.info = format!("{}: {}", self.type_name(), info);
        }

        fn sinks(&self) -> &[prism::graph::Sink] {
            &self.ports.sinks
        }

        fn sinks_mut(&mut self) -> &mut [prism::graph::Sink] {
            &mut self.ports.sinks
        }

        fn sources(&self) -> &[prism::graph::Source] {
            &self.ports.sources
        }

        fn sources_mut(&mut self) -> &mut [prism::graph::Source] {
            &mut self.ports.sources
        }

        fn set_notifier(&mut self, notifier: PropertyNotifier) {
            self.notifier = Some(notifier);
        }

        fn set_property(&mut self, index: u32, value: &str, notify: bool) -> bool {
            self.props
                .set_serialized(index, value, notify, self.notifier.as_ref())
        }

        fn set_property_value(&mut self, index: u32, value: &PropertyValue, notify: bool) -> bool {
            self.props
                .set_by_index(index, value, notify, self.notifier.as_ref())
        }

        fn properties(&self) -> String {
            self.props.serialize()
        }

        fn property_desc(&self, name: &str) -> Option<(u32, PropertyType)> {
            self.props.property_desc(name)
        }
    };
}

/// Render-texture source with no inputs.
pub struct TestSource {
    info: String,
    ports: Ports,
    props: TestSourceProps,
    notifier: Option<PropertyNotifier>,
}

impl TestSource {
    pub fn create(_ctx: &NodeContext, properties: &str) -> Result<Box<dyn Node>> {
        let mut props = TestSourceProps::default();
        props.deserialize(properties, false, None);
        Ok(Box::new(Self {
            info: "TestSource: Unnamed".to_string(),
            ports: Ports::new(&[], &[PortKind::RenderTexture]),
            props,
            notifier: None,
        }))
    }
}

impl Node for TestSource {
    fn type_name(&self) -> &'static str {
        "TestSource"
    }

    fn node_kind(&self) -> NodeKind {
        NodeKind::Input
    }

    test_node_boilerplate!();
}

/// Audio-only source, for port-compatibility tests.
pub struct TestAudioSource {
    info: String,
    ports: Ports,
    props: TestSourceProps,
    notifier: Option<PropertyNotifier>,
}

impl TestAudioSource {
    pub fn create(_ctx: &NodeContext, properties: &str) -> Result<Box<dyn Node>> {
        let mut props = TestSourceProps::default();
        props.deserialize(properties, false, None);
        Ok(Box::new(Self {
            info: "TestAudioSource: Unnamed".to_string(),
            ports: Ports::new(&[], &[PortKind::Audio]),
            props,
            notifier: None,
        }))
    }
}

impl Node for TestAudioSource {
    fn type_name(&self) -> &'static str {
        "TestAudioSource"
    }

    fn node_kind(&self) -> NodeKind {
        NodeKind::Input
    }

    test_node_boilerplate!();
}

/// One-in/one-out pass-through filter.
pub struct TestFilter {
    info: String,
    ports: Ports,
    props: TestSourceProps,
    notifier: Option<PropertyNotifier>,
}

impl TestFilter {
    pub fn create(_ctx: &NodeContext, properties: &str) -> Result<Box<dyn Node>> {
        let mut props = TestSourceProps::default();
        props.deserialize(properties, false, None);
        Ok(Box::new(Self {
            info: "TestFilter: Unnamed".to_string(),
            ports: Ports::new(&[PortKind::RenderTexture], &[PortKind::RenderTexture]),
            props,
            notifier: None,
        }))
    }
}

impl Node for TestFilter {
    fn type_name(&self) -> &'static str {
        "TestFilter"
    }

    fn node_kind(&self) -> NodeKind {
        NodeKind::Filter
    }

    fn evaluation_strategy(&self) -> EvaluationStrategy {
        EvaluationStrategy::Inherited
    }

    test_node_boilerplate!();
}

/// Output recording the PTS of every frame it is asked to produce.
pub struct TestOutput {
    info: String,
    ports: Ports,
    props: TestOutputProps,
    notifier: Option<PropertyNotifier>,
    base_pts: i64,
}

impl TestOutput {
    pub fn create(_ctx: &NodeContext, properties: &str) -> Result<Box<dyn Node>> {
        let mut props = TestOutputProps::default();
        props.deserialize(properties, false, None);
        Ok(Box::new(Self {
            info: "TestOutput: Unnamed".to_string(),
            ports: Ports::new(&[PortKind::RenderTexture], &[]),
            props,
            notifier: None,
            base_pts: INVALID_PTS,
        }))
    }
}

impl Node for TestOutput {
    fn type_name(&self) -> &'static str {
        "TestOutput"
    }

    fn node_kind(&self) -> NodeKind {
        NodeKind::Output
    }

    fn evaluation_strategy(&self) -> EvaluationStrategy {
        EvaluationStrategy::Inherited
    }

    test_node_boilerplate!();

    fn output_fps(&self) -> Rational {
        let rate = self.props.framerate();
        Rational::new(rate.x as i32, rate.y.max(1) as i32)
    }

    fn output_size(&self) -> (u32, u32) {
        (1280, 720)
    }

    fn set_base_pts(&mut self, pts: i64) {
        self.base_pts = pts;
    }

    fn base_pts(&self) -> i64 {
        self.base_pts
    }

    fn evaluate_output(&mut self, _arena: &NodeArena, pts: i64) -> bool {
        evaluated_pts().lock().unwrap().push(pts);
        true
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Registry carrying every mock node type.
pub fn test_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    registry.register(
        "TestSource",
        TestSource::create,
        StaticNodeInfo { sinks: 0, sources: 1 },
    );
    registry.register(
        "TestAudioSource",
        TestAudioSource::create,
        StaticNodeInfo { sinks: 0, sources: 1 },
    );
    registry.register(
        "TestFilter",
        TestFilter::create,
        StaticNodeInfo { sinks: 1, sources: 1 },
    );
    registry.register(
        "TestOutput",
        TestOutput::create,
        StaticNodeInfo { sinks: 1, sources: 0 },
    );
    registry
}
