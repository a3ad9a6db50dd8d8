pub const FORCE_FALLBACK_ENV: &str = "GRAPHAURA_FORCE_FALLBACK";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderCapability {
    /// Name of the adapter that answered the probe.
    Available(String),
    Unavailable(String),
}

fn env_set(name: &str) -> bool {
    std::env::var(name).map_or(false, |v| !v.trim().is_empty() && v != "0")
}

/// Reason to skip the adapter probe entirely, if any.
fn precheck(forced: bool, has_display: bool) -> Option<String> {
    if forced {
        return Some(format!("forced by {FORCE_FALLBACK_ENV}"));
    }
    if !has_display {
        return Some("no display server available".to_string());
    }
    None
}

fn has_display() -> bool {
    if cfg!(target_os = "linux") {
        env_set("DISPLAY") || env_set("WAYLAND_DISPLAY")
    } else {
        true
    }
}

/// Asks wgpu for any adapter before the window and renderer come up.
pub fn probe() -> RenderCapability {
    if let Some(reason) = precheck(env_set(FORCE_FALLBACK_ENV), has_display()) {
        return RenderCapability::Unavailable(reason);
    }

    let rt = match tokio::runtime::Builder::new_current_thread().build() {
        Ok(rt) => rt,
        Err(e) => return RenderCapability::Unavailable(format!("probe runtime: {e}")),
    };
    rt.block_on(async {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let options = wgpu::RequestAdapterOptions::default();
        match instance.request_adapter(&options).await {
            Some(adapter) => {
                let info = adapter.get_info();
                RenderCapability::Available(format!("{} ({:?})", info.name, info.backend))
            }
            None => RenderCapability::Unavailable("no compatible graphics adapter".to_string()),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_fallback_wins() {
        let reason = precheck(true, true).expect("reason");
        assert!(reason.contains(FORCE_FALLBACK_ENV));
    }

    #[test]
    fn missing_display_is_unavailable() {
        assert!(precheck(false, false).is_some());
        assert_eq!(precheck(false, true), None);
    }
}
