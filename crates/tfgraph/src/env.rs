use std::env;
use std::sync::OnceLock;

static TFGRAPH_SHAPE_INFERENCE: OnceLock<bool> = OnceLock::new();
static TFGRAPH_STRICT_NAMES: OnceLock<bool> = OnceLock::new();

fn parse_bool(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_flag(name: &str, default: bool, cache: &OnceLock<bool>) -> bool {
    *cache.get_or_init(|| match env::var(name) {
        Ok(value) if !value.trim().is_empty() => parse_bool(&value).unwrap_or_else(|| {
            tracing::warn!("ignoring unrecognised value {value:?} for {name}");
            default
        }),
        _ => default,
    })
}

pub(crate) fn shape_inference_enabled() -> bool {
    env_flag("TFGRAPH_SHAPE_INFERENCE", true, &TFGRAPH_SHAPE_INFERENCE)
}

pub(crate) fn strict_names_enabled() -> bool {
    env_flag("TFGRAPH_STRICT_NAMES", false, &TFGRAPH_STRICT_NAMES)
}
