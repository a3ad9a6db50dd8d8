use anyhow::Result;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentConfig {
    /// Graph file served and written back. Without it the graph lives in
    /// memory only and starts from the demo snapshot.
    pub data: Option<PathBuf>,
    pub socket: Option<String>,
    /// Extraction JSON pushed to the first viewer that asks for a snapshot.
    pub ingest: Option<PathBuf>,
}

pub fn parse_args() -> Result<AgentConfig> {
    parse_args_from(std::env::args_os().skip(1))
}

fn parse_args_from<I>(args: I) -> Result<AgentConfig>
where
    I: IntoIterator<Item = OsString>,
{
    let mut config = AgentConfig::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--data" {
            let Some(path) = args.next() else {
                anyhow::bail!("--data expects a path");
            };
            config.data = Some(PathBuf::from(path));
        } else if arg == "--socket" {
            let Some(path) = args.next() else {
                anyhow::bail!("--socket expects a path");
            };
            let Some(path) = path.to_str() else {
                anyhow::bail!("--socket path is not valid UTF-8: {:?}", path);
            };
            config.socket = Some(path.to_string());
        } else if arg == "--ingest" {
            let Some(path) = args.next() else {
                anyhow::bail!("--ingest expects a path");
            };
            config.ingest = Some(PathBuf::from(path));
        } else {
            anyhow::bail!("unknown argument: {:?}", arg);
        }
    }

    Ok(config)
}

pub fn runtime_sock_path() -> String {
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        format!("{dir}/graphaura.sock")
    } else {
        "/tmp/graphaura.sock".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn no_flags_means_in_memory_demo() {
        let config = parse_args_from(Vec::new()).expect("config parsed");
        assert_eq!(config, AgentConfig::default());
    }

    #[test]
    fn parses_all_flags() {
        let config = parse_args_from(args(&[
            "--data",
            "/tmp/g.json",
            "--socket",
            "/tmp/a.sock",
            "--ingest",
            "/tmp/e.json",
        ]))
        .expect("config parsed");
        assert_eq!(config.data, Some(PathBuf::from("/tmp/g.json")));
        assert_eq!(config.socket.as_deref(), Some("/tmp/a.sock"));
        assert_eq!(config.ingest, Some(PathBuf::from("/tmp/e.json")));
    }

    #[test]
    fn missing_value_is_an_error() {
        let err = parse_args_from(args(&["--data"])).expect_err("must fail");
        assert!(err.to_string().contains("--data"));
    }

    #[test]
    fn unknown_flag_is_an_error() {
        assert!(parse_args_from(args(&["--mode", "user"])).is_err());
    }
}
