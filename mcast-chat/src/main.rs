/// Serverless chat over UDP multicast
///
/// Every participant joins the same group and port; the network fabric is
/// the message bus. There is no server, no registry, and no history.
use anyhow::Result;
use clap::Parser;
use std::net::IpAddr;
use std::sync::Arc;

mod console;
mod display;
mod net;
mod session;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Multicast group address (IPv4 or IPv6)
    #[arg(short, long, default_value = "239.42.0.1")]
    group: IpAddr,

    /// UDP port to use for the multicast group
    #[arg(short, long, default_value_t = 9999, value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Display name to use in the chat (defaults to your username)
    #[arg(short, long)]
    name: Option<String>,

    /// Network interface name to join for multicast traffic (optional)
    #[arg(short, long)]
    iface: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(
            &std::env::var("RUST_LOG").unwrap_or_default(),
        ))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if !args.group.is_multicast() {
        eprintln!("{} is not a multicast address", args.group);
        std::process::exit(2);
    }

    let iface = match trimmed(args.iface.as_deref()) {
        Some(name) => match net::Iface::resolve(name) {
            Ok(iface) => Some(iface),
            Err(e) => {
                eprintln!("unable to use interface {name:?}: {e}");
                std::process::exit(2);
            }
        },
        None => None,
    };

    let name = trimmed(args.name.as_deref())
        .map(String::from)
        .unwrap_or_else(default_name);
    let identity = session::Identity::generate(name);

    let sockets = net::open(args.group, args.port, iface.as_ref())?;

    let console = Arc::new(console::Console::stdio());
    console.banner(&format!(
        "Joined multicast chat {}:{} over {} as {}\n\
         Type your messages and press Enter to send. Press Ctrl+C or Ctrl+D to exit.",
        args.group,
        args.port,
        net::family_name(args.group),
        identity.name,
    ));

    session::run(sockets, identity, console).await
}

/// Warnings must reach the user without any RUST_LOG configuration; the
/// interface-fallback diagnostic in particular is load-bearing.
fn log_filter(directives: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .parse_lossy(directives)
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Fall back to the environment's idea of who is sitting at the keyboard,
/// then to the machine's name.
fn default_name() -> String {
    resolve_name(
        ["USER", "USERNAME"]
            .iter()
            .filter_map(|var| std::env::var(var).ok()),
        gethostname::gethostname().into_string().ok(),
    )
}

fn resolve_name(env_names: impl Iterator<Item = String>, hostname: Option<String>) -> String {
    env_names
        .chain(hostname)
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| "guest".to_string())
}

#[cfg(test)]
mod test {
    use super::{log_filter, resolve_name};

    #[test]
    fn test_log_filter_defaults_to_warn() {
        assert_eq!(log_filter("").to_string(), "warn");
    }

    #[test]
    fn test_log_filter_honors_explicit_directives() {
        assert_eq!(log_filter("debug").to_string(), "debug");
    }

    #[test]
    fn test_resolve_name_prefers_environment() {
        let names = vec!["alice".to_string()];
        assert_eq!(
            resolve_name(names.into_iter(), Some("myhost".to_string())),
            "alice"
        );
    }

    #[test]
    fn test_resolve_name_falls_back_to_hostname() {
        let names = vec!["   ".to_string()];
        assert_eq!(
            resolve_name(names.into_iter(), Some("myhost".to_string())),
            "myhost"
        );
    }

    #[test]
    fn test_resolve_name_last_resort_is_guest() {
        assert_eq!(resolve_name(std::iter::empty(), None), "guest");
    }
}
