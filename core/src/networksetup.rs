//! macOS proxy settings via the `networksetup` CLI

use crate::{Credentials, Error, NetworkService, ObservedProxyState, Result, SubProtocol};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::process::{Command, Output};

pub const DEFAULT_NETWORKSETUP_PATH: &str = "/usr/sbin/networksetup";

static ENABLED_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^Enabled: (.*?)\r?$").unwrap());
static SERVER_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^Server: (.*?)\r?$").unwrap());
static PORT_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^Port: (.*?)\r?$").unwrap());
static SERVICE_ORDER_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\((\d+)\) (.*)\r?\n\(Hardware Port: (.*), Device: (.*)\)").unwrap()
});

/// Read and write access to the OS proxy settings of a network service
pub trait ProxyConfigStore: Send + Sync {
    fn get(&self, protocol: SubProtocol, service: &str) -> Result<ObservedProxyState>;

    /// Configure and switch on a proxy. Authentication is turned on only
    /// when credentials are given.
    fn set(
        &self,
        protocol: SubProtocol,
        service: &str,
        domain: &str,
        port: &str,
        credentials: Option<&Credentials>,
    ) -> Result<()>;

    fn set_enabled(&self, protocol: SubProtocol, service: &str, enabled: bool) -> Result<()>;

    fn list_network_services(&self) -> Result<Vec<NetworkService>>;
}

/// Output from a command execution
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

fn get_flag(protocol: SubProtocol) -> &'static str {
    match protocol {
        SubProtocol::Http => "-getwebproxy",
        SubProtocol::Https => "-getsecurewebproxy",
        SubProtocol::Socks => "-getsocksfirewallproxy",
    }
}

fn set_flag(protocol: SubProtocol) -> &'static str {
    match protocol {
        SubProtocol::Http => "-setwebproxy",
        SubProtocol::Https => "-setsecurewebproxy",
        SubProtocol::Socks => "-setsocksfirewallproxy",
    }
}

fn state_flag(protocol: SubProtocol) -> &'static str {
    match protocol {
        SubProtocol::Http => "-setwebproxystate",
        SubProtocol::Https => "-setsecurewebproxystate",
        SubProtocol::Socks => "-setsocksfirewallproxystate",
    }
}

/// Adapter for proxy settings via the `networksetup` binary
#[derive(Debug, Clone)]
pub struct NetworksetupStore {
    program: String,
}

impl Default for NetworksetupStore {
    fn default() -> Self {
        Self::new(DEFAULT_NETWORKSETUP_PATH)
    }
}

impl NetworksetupStore {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run networksetup and capture output
    pub fn run_cmd(&self, args: &[&str]) -> Result<CommandOutput> {
        debug!("running {} {}", self.program, redacted_args(args));
        let output = Command::new(&self.program).args(args).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::CommandNotFound(self.program.clone())
            } else {
                Error::Command {
                    cmd: format!("{} {}", self.program, redacted_args(args)),
                    message: e.to_string(),
                }
            }
        })?;

        Ok(Self::parse_output(output))
    }

    fn parse_output(output: Output) -> CommandOutput {
        CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    /// Run a mutating command. networksetup reports failures on stdout
    /// while still exiting 0, so any output at all counts as an error.
    fn run_mutation(&self, args: &[&str]) -> Result<()> {
        let output = self.run_cmd(args)?;
        let message = format!("{}{}", output.stdout.trim(), output.stderr.trim());
        if !output.success() {
            return Err(Error::Command {
                cmd: format!("{} {}", self.program, args.first().copied().unwrap_or_default()),
                message: if message.is_empty() {
                    format!("exit code {}", output.exit_code)
                } else {
                    message
                },
            });
        }
        if !message.is_empty() {
            return Err(Error::backend(message));
        }
        Ok(())
    }
}

/// Hide the password that follows `on <username>` in a set command
fn redacted_args(args: &[&str]) -> String {
    let mut shown: Vec<&str> = args.to_vec();
    if shown.len() == 7 && shown[4] == "on" {
        shown[6] = "<redacted>";
    }
    shown.join(" ")
}

/// Parse the output of one of the `-get*proxy` commands
pub fn parse_proxy_info(stdout: &str) -> Result<ObservedProxyState> {
    let capture = |re: &Regex, field: &str| -> Result<String> {
        re.captures(stdout)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .ok_or_else(|| Error::parse(format!("missing '{}' line in networksetup output", field)))
    };

    let enabled = capture(&ENABLED_LINE, "Enabled")?;
    let server = capture(&SERVER_LINE, "Server")?;
    let port = capture(&PORT_LINE, "Port")?;

    Ok(ObservedProxyState {
        enabled: enabled.eq_ignore_ascii_case("yes"),
        server: Some(server),
        port: Some(port),
    })
}

/// Parse `networksetup -listnetworkserviceorder`
pub fn parse_service_order(stdout: &str) -> Result<Vec<NetworkService>> {
    let mut services = Vec::new();
    for caps in SERVICE_ORDER_ENTRY.captures_iter(stdout) {
        let index = caps[1]
            .parse::<u32>()
            .map_err(|e| Error::parse(format!("bad service index '{}': {}", &caps[1], e)))?;
        services.push(NetworkService {
            index,
            name: caps[2].trim().to_string(),
            hardware_port: caps[3].trim().to_string(),
            device: caps[4].trim().to_string(),
        });
    }
    Ok(services)
}

impl ProxyConfigStore for NetworksetupStore {
    fn get(&self, protocol: SubProtocol, service: &str) -> Result<ObservedProxyState> {
        let output = self.run_cmd(&[get_flag(protocol), service])?;
        if !output.success() {
            return Err(Error::Command {
                cmd: format!("{} {} {}", self.program, get_flag(protocol), service),
                message: format!("{}{}", output.stdout.trim(), output.stderr.trim()),
            });
        }
        parse_proxy_info(&output.stdout)
    }

    fn set(
        &self,
        protocol: SubProtocol,
        service: &str,
        domain: &str,
        port: &str,
        credentials: Option<&Credentials>,
    ) -> Result<()> {
        let flag = set_flag(protocol);
        match credentials {
            Some(creds) => self.run_mutation(&[
                flag,
                service,
                domain,
                port,
                "on",
                creds.username.as_str(),
                creds.password.as_str(),
            ]),
            None => self.run_mutation(&[flag, service, domain, port, "off"]),
        }
    }

    fn set_enabled(&self, protocol: SubProtocol, service: &str, enabled: bool) -> Result<()> {
        let state = if enabled { "on" } else { "off" };
        self.run_mutation(&[state_flag(protocol), service, state])
    }

    fn list_network_services(&self) -> Result<Vec<NetworkService>> {
        let output = self.run_cmd(&["-listnetworkserviceorder"])?;
        if !output.success() {
            return Err(Error::Command {
                cmd: format!("{} -listnetworkserviceorder", self.program),
                message: output.stderr.trim().to_string(),
            });
        }
        parse_service_order(&output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOCKS_OUTPUT: &str = "Enabled: Yes\nServer: 192.168.1.9\nPort: 1080\nAuthenticated Proxy Enabled: 0\n";

    const SERVICE_ORDER: &str = "An asterisk (*) denotes that a network service is disabled.
(1) Wi-Fi
(Hardware Port: Wi-Fi, Device: en0)

(2) Thunderbolt Bridge
(Hardware Port: Thunderbolt Bridge, Device: bridge0)

(10) USB 10/100/1000 LAN
(Hardware Port: USB 10/100/1000 LAN, Device: en7)
";

    #[test]
    fn test_parse_proxy_info() {
        let info = parse_proxy_info(SOCKS_OUTPUT).unwrap();
        assert!(info.enabled);
        assert_eq!(info.server.as_deref(), Some("192.168.1.9"));
        assert_eq!(info.port.as_deref(), Some("1080"));
    }

    #[test]
    fn test_parse_proxy_info_disabled_and_empty() {
        let info = parse_proxy_info("Enabled: No\nServer: \nPort: 0\nAuthenticated Proxy Enabled: 0\n").unwrap();
        assert!(!info.enabled);
        assert_eq!(info.server.as_deref(), Some(""));
        assert_eq!(info.port.as_deref(), Some("0"));
    }

    #[test]
    fn test_parse_proxy_info_malformed() {
        let err = parse_proxy_info("** Error: The parameters were not valid.\n").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.is_backend_failure());
    }

    #[test]
    fn test_parse_service_order() {
        let services = parse_service_order(SERVICE_ORDER).unwrap();
        assert_eq!(services.len(), 3);
        assert_eq!(services[0].index, 1);
        assert_eq!(services[0].name, "Wi-Fi");
        assert_eq!(services[0].device, "en0");
        assert_eq!(services[1].hardware_port, "Thunderbolt Bridge");
        assert_eq!(services[2].index, 10);
        assert_eq!(services[2].name, "USB 10/100/1000 LAN");
    }

    #[test]
    fn test_redacted_args() {
        let shown = redacted_args(&["-setwebproxy", "Wi-Fi", "h", "80", "on", "bob", "hunter2"]);
        assert_eq!(shown, "-setwebproxy Wi-Fi h 80 on bob <redacted>");
        assert_eq!(redacted_args(&["-setwebproxystate", "Wi-Fi", "on"]), "-setwebproxystate Wi-Fi on");
    }

    #[test]
    fn test_missing_program() {
        let store = NetworksetupStore::new("/nonexistent/networksetup");
        let err = store.get(SubProtocol::Http, "Wi-Fi").unwrap_err();
        assert!(matches!(err, Error::CommandNotFound(_)));
    }

    #[cfg(unix)]
    mod fake_binary {
        use super::super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;
        use tempfile::tempdir;

        /// Script that logs its argv to `calls.log` and prints `reply`
        fn fake_networksetup(dir: &Path, reply: &str) -> NetworksetupStore {
            let log = dir.join("calls.log");
            let script = dir.join("networksetup");
            fs::write(
                &script,
                format!(
                    "#!/bin/sh\necho \"$@\" >> '{}'\nprintf '%s' '{}'\n",
                    log.display(),
                    reply
                ),
            )
            .unwrap();
            let mut perms = fs::metadata(&script).unwrap().permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&script, perms).unwrap();
            NetworksetupStore::new(script.to_string_lossy())
        }

        fn calls(dir: &Path) -> String {
            fs::read_to_string(dir.join("calls.log")).unwrap_or_default()
        }

        #[test]
        fn test_set_without_credentials_turns_auth_off() {
            let dir = tempdir().unwrap();
            let store = fake_networksetup(dir.path(), "");
            store
                .set(SubProtocol::Socks, "Wi-Fi", "192.168.1.9", "1080", None)
                .unwrap();
            assert_eq!(calls(dir.path()).trim(), "-setsocksfirewallproxy Wi-Fi 192.168.1.9 1080 off");
        }

        #[test]
        fn test_set_with_credentials_turns_auth_on() {
            let dir = tempdir().unwrap();
            let store = fake_networksetup(dir.path(), "");
            let creds = Credentials::from_parts("bob", "pw").unwrap();
            store
                .set(SubProtocol::Https, "Wi-Fi", "proxy.lan", "3128", Some(&creds))
                .unwrap();
            assert_eq!(calls(dir.path()).trim(), "-setsecurewebproxy Wi-Fi proxy.lan 3128 on bob pw");
        }

        #[test]
        fn test_set_enabled_reports_output_as_error() {
            let dir = tempdir().unwrap();
            let store = fake_networksetup(dir.path(), "Wi-Fy is not a recognized network service.");
            let err = store.set_enabled(SubProtocol::Http, "Wi-Fy", false).unwrap_err();
            assert!(matches!(err, Error::Backend(ref m) if m.contains("not a recognized")));
            assert_eq!(calls(dir.path()).trim(), "-setwebproxystate Wi-Fy off");
        }

        #[test]
        fn test_get_parses_script_output() {
            let dir = tempdir().unwrap();
            let store = fake_networksetup(dir.path(), "Enabled: Yes\nServer: 10.0.0.2\nPort: 8080\n");
            let info = store.get(SubProtocol::Http, "Wi-Fi").unwrap();
            assert_eq!(info, ObservedProxyState::new(true, "10.0.0.2", "8080"));
            assert_eq!(calls(dir.path()).trim(), "-getwebproxy Wi-Fi");
        }
    }
}
