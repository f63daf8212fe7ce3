//! UI message protocol.
//!
//! The host runtime sends named requests with positional arguments; every
//! request carries a correlation id and the reply comes back as a single
//! `co_return` message echoing it. Message names arrive as UTF-16 from the
//! embedder and are matched here after conversion.
//!
//! Node handles travel as doubles: the bit pattern of the generational
//! key's 64-bit FFI form. A stale handle simply fails to resolve.

use slotmap::{Key, KeyData};

use crate::graph::{GraphModel, NodeContext, NodeKey};
use crate::sync::MasterClock;

/// Name of every reply message.
pub const RETURN_MESSAGE_NAME: &str = "co_return";

/// One argument or return value on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum UiValue {
    Bool(bool),
    Int(i32),
    Double(f64),
    String(String),
}

impl UiValue {
    fn as_double(&self) -> Option<f64> {
        match self {
            UiValue::Double(v) => Some(*v),
            UiValue::Int(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    fn as_int(&self) -> Option<i32> {
        match self {
            UiValue::Int(v) => Some(*v),
            UiValue::Double(v) => Some(*v as i32),
            _ => None,
        }
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            UiValue::String(v) => Some(v),
            _ => None,
        }
    }
}

/// A request from the host runtime.
#[derive(Debug, Clone)]
pub struct UiRequest {
    pub correlation_id: u64,
    /// Message name as sent by the embedder (UTF-16 code units).
    pub name: Vec<u16>,
    pub args: Vec<UiValue>,
}

impl UiRequest {
    #[must_use]
    pub fn new(correlation_id: u64, name: &str, args: Vec<UiValue>) -> Self {
        Self {
            correlation_id,
            name: name.encode_utf16().collect(),
            args,
        }
    }
}

/// The reply sent back as a `co_return` message.
#[derive(Debug, Clone, PartialEq)]
pub struct UiReply {
    pub correlation_id: u64,
    pub values: Vec<UiValue>,
}

fn node_handle_to_double(key: NodeKey) -> f64 {
    f64::from_bits(key.data().as_ffi())
}

fn node_handle_from_double(handle: f64) -> NodeKey {
    KeyData::from_ffi(handle.to_bits()).into()
}

/// Applies one request to the graph model and produces its reply.
///
/// Unknown names and malformed argument tuples are logged and answered
/// with an empty reply; no state is mutated.
pub fn dispatch_request<C: MasterClock>(
    model: &mut GraphModel<C>,
    ctx: &NodeContext,
    request: &UiRequest,
) -> UiReply {
    let name = String::from_utf16_lossy(&request.name);
    let args = &request.args;
    let reply = |values: Vec<UiValue>| UiReply {
        correlation_id: request.correlation_id,
        values,
    };

    match name.as_str() {
        "GetNodeTypesAsync" => {
            let mut types = serde_json::Map::new();
            for (type_name, info) in model.registry().node_types() {
                types.insert(
                    type_name.to_string(),
                    serde_json::to_value(info).unwrap_or(serde_json::Value::Null),
                );
            }
            let payload = serde_json::Value::Object(types).to_string();
            reply(vec![UiValue::String(payload)])
        }
        "CreateNodeAsync" => {
            let Some(type_name) = args.first().and_then(UiValue::as_str) else {
                log::error!("CreateNodeAsync: expected (string)");
                return reply(vec![]);
            };
            match model.create_node(ctx, type_name, "{}") {
                Ok(key) => reply(vec![UiValue::Double(node_handle_to_double(key))]),
                Err(_) => reply(vec![UiValue::Double(0.0)]),
            }
        }
        "GetNodePropertiesAsync" => {
            let Some(handle) = args.first().and_then(UiValue::as_double) else {
                log::error!("GetNodePropertiesAsync: expected (double)");
                return reply(vec![]);
            };
            let properties = model.node_properties(node_handle_from_double(handle));
            reply(vec![UiValue::String(properties)])
        }
        "RemoveNode" => {
            let Some(handle) = args.first().and_then(UiValue::as_double) else {
                log::error!("RemoveNode: expected (double)");
                return reply(vec![]);
            };
            model.remove_node(node_handle_from_double(handle));
            reply(vec![])
        }
        "ConnectNodes" | "DisconnectNodes" => {
            let parsed = (
                args.first().and_then(UiValue::as_double),
                args.get(1).and_then(UiValue::as_int),
                args.get(2).and_then(UiValue::as_double),
                args.get(3).and_then(UiValue::as_int),
            );
            let (Some(from), Some(from_index), Some(to), Some(to_index)) = parsed else {
                log::error!("{name}: expected (double, int, double, int)");
                return reply(vec![UiValue::Bool(false)]);
            };
            let from = node_handle_from_double(from);
            let to = node_handle_from_double(to);
            let ok = if name == "ConnectNodes" {
                model.connect_nodes(from, from_index, to, to_index)
            } else {
                model.disconnect_nodes(from, from_index, to, to_index)
            };
            reply(vec![UiValue::Bool(ok)])
        }
        "SetNodeInfo" => {
            let (Some(handle), Some(info)) = (
                args.first().and_then(UiValue::as_double),
                args.get(1).and_then(UiValue::as_str),
            ) else {
                log::error!("SetNodeInfo: expected (double, string)");
                return reply(vec![]);
            };
            model.set_node_info(node_handle_from_double(handle), info);
            reply(vec![])
        }
        "SetNodeProperty" => {
            let (Some(handle), Some(index), Some(value)) = (
                args.first().and_then(UiValue::as_double),
                args.get(1).and_then(UiValue::as_int),
                args.get(2).and_then(UiValue::as_str),
            ) else {
                log::error!("SetNodeProperty: expected (double, int, string)");
                return reply(vec![]);
            };
            if index >= 0 {
                model.set_node_property(
                    node_handle_from_double(handle),
                    index as u32,
                    value,
                    false,
                );
            }
            reply(vec![])
        }
        _ => {
            log::error!("Unknown UI message: {name}");
            reply(vec![])
        }
    }
}
