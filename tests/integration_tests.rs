mod common;

use common::ScriptedConsole;
use linkterm::domain::config::{ConnectionConfig, EolMode, FilterKind, TerminalConfig};
use linkterm::domain::error::ChannelOp;
use linkterm::infrastructure::open_channel;
use linkterm::{LinkTermConfig, LinkTermError, Session};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::time::Duration;

/// Integration tests for LinkTerm library
#[cfg(test)]
mod integration_tests {
    use super::*;

    fn tcp_listener() -> (TcpListener, ConnectionConfig) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("socket://{}", listener.local_addr().unwrap());
        let connection = ConnectionConfig::from_url(&url, 0).unwrap();
        (listener, connection)
    }

    #[test]
    fn test_config_serialization() {
        let mut config = LinkTermConfig::default();
        config.terminal.filters = vec![FilterKind::Colorize, FilterKind::Debug];
        config.terminal.eol = EolMode::Cr;

        let toml_str = toml::to_string(&config).expect("Failed to serialize config");
        let deserialized: LinkTermConfig =
            toml::from_str(&toml_str).expect("Failed to deserialize config");

        assert_eq!(config.global.log_level, deserialized.global.log_level);
        assert_eq!(config.terminal, deserialized.terminal);
    }

    #[test]
    fn test_tcp_session_end_to_end() {
        let (listener, connection) = tcp_listener();
        let channel = open_channel(&connection).unwrap();
        let (mut peer, _) = listener.accept().unwrap();
        peer.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

        let console = ScriptedConsole::new();
        let config = TerminalConfig {
            eol: EolMode::Crlf,
            ..TerminalConfig::default()
        };
        let session = Session::new(channel, console.clone(), &config).unwrap();
        session.start().unwrap();

        console.push_keys(&["A", "T", "\n"]);
        let mut received = [0u8; 4];
        peer.read_exact(&mut received).unwrap();
        assert_eq!(&received, b"AT\r\n");

        peer.write_all(b"OK\r\n").unwrap();
        assert!(console.wait_for_output("OK\r\n"));

        console.push_keys(&["\x1d"]);
        session.join(false).unwrap();
        session.close().unwrap();

        // the peer sees the connection go away
        let mut rest = Vec::new();
        assert_eq!(peer.read_to_end(&mut rest).unwrap(), 0);
    }

    #[test]
    fn test_tcp_peer_close_is_transport_fault() {
        let (listener, connection) = tcp_listener();
        let channel = open_channel(&connection).unwrap();
        let (peer, _) = listener.accept().unwrap();

        let console = ScriptedConsole::new();
        let session = Session::new(channel, console, &TerminalConfig::default()).unwrap();
        session.start().unwrap();

        drop(peer);

        match session.join(false) {
            Err(LinkTermError::Transport { op, .. }) => assert_eq!(op, ChannelOp::Read),
            other => panic!("expected transport fault, got {:?}", other),
        }
        session.close().unwrap();
    }

    #[test]
    fn test_open_unsupported_url() {
        assert!(matches!(
            ConnectionConfig::from_url("rfc2217://host:2217", 9600),
            Err(LinkTermError::Config { .. })
        ));
    }
}
