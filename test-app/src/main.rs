// picolink test application -- CLI tool for building, checking, and sending
// framed commands to a microcontroller over USB CDC or a UART.
//
// Usage:
//   picolink-test-app build 0x01 0x02 0
//   picolink-test-app parse "A5 04 01 02 00 00 75 FC"
//   picolink-test-app --port /dev/ttyACM0 send 0x01 0x02 0 --repeat 2
//   picolink-test-app --port COM8 --crc-over-stx transact 0x01 0x10 25
//   picolink-test-app --mock -v send 0x01 0x10 25
//
// Addresses and commands without a `0x` prefix are read as hex when every
// character is a hex digit (`10` is 16). Data without a prefix is decimal.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use picolink::{CommandSender, CrcScope, Error, FrameCodec, SenderBuilder, Value, hex_string};
use picolink_test_harness::MockTransport;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// picolink test application -- frames and sends device commands.
#[derive(Parser)]
#[command(name = "picolink-test-app", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyACM0, COM8).
    /// Required for `send` and `transact` unless --mock is used.
    #[arg(long)]
    port: Option<String>,

    /// Baud rate. Ignored by pure USB CDC devices.
    #[arg(long, default_value_t = 115_200)]
    baud: u32,

    /// Start-of-frame marker (hex, e.g. 0xA5).
    #[arg(long, default_value = "0xA5", value_parser = parse_hex_u8)]
    stx: u8,

    /// Include the STX byte in the CRC, as the reference firmware does.
    #[arg(long)]
    crc_over_stx: bool,

    /// Read timeout in milliseconds.
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Wait after opening the port before the first write, in milliseconds.
    #[arg(long, default_value_t = 2000)]
    settle_ms: u64,

    /// Use a loopback mock transport instead of a real serial port.
    /// Every frame sent is echoed back.
    #[arg(long)]
    mock: bool,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Parse a hex string like "0xA5" or "A5" into a u8.
fn parse_hex_u8(s: &str) -> std::result::Result<u8, String> {
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u8::from_str_radix(s, 16).map_err(|e| format!("invalid hex byte: {e}"))
}

#[derive(Subcommand)]
enum Command {
    /// Print the frame for a command without opening a port.
    Build {
        addr: String,
        cmd: String,
        /// Payload: integer (`25`, `0x19`), or omitted for none.
        data: Option<String>,
    },

    /// Validate a frame given as hex and print its fields.
    Parse {
        /// Frame bytes, e.g. "A5 04 01 02 00 00 75 FC".
        hex: String,
    },

    /// Send a command and print whatever comes back.
    Send {
        addr: String,
        cmd: String,
        data: Option<String>,

        /// Number of times to send.
        #[arg(long, default_value_t = 1)]
        repeat: u32,

        /// Pause between repeats in milliseconds.
        #[arg(long, default_value_t = 200)]
        interval_ms: u64,
    },

    /// Send a command and wait for one framed reply.
    Transact {
        addr: String,
        cmd: String,
        data: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Build { addr, cmd, data } => cmd_build(&cli, addr, cmd, data.as_deref()),
        Command::Parse { hex } => cmd_parse(&cli, hex),
        Command::Send {
            addr,
            cmd,
            data,
            repeat,
            interval_ms,
        } => {
            let frame = codec(&cli)
                .build(addr.as_str(), cmd.as_str(), data_value(data.as_deref()))
                .context("failed to build frame")?;
            let mut sender = create_sender(&cli, &frame, *repeat as usize).await?;
            let result = cmd_send(
                &mut sender,
                addr,
                cmd,
                data.as_deref(),
                *repeat,
                Duration::from_millis(*interval_ms),
            )
            .await;
            sender.close().await.ok();
            result
        }
        Command::Transact { addr, cmd, data } => {
            let frame = codec(&cli)
                .build(addr.as_str(), cmd.as_str(), data_value(data.as_deref()))
                .context("failed to build frame")?;
            let mut sender = create_sender(&cli, &frame, 1).await?;
            let result = cmd_transact(&mut sender, addr, cmd, data.as_deref()).await;
            sender.close().await.ok();
            result
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// Sender construction
// ---------------------------------------------------------------------------

fn crc_scope(cli: &Cli) -> CrcScope {
    if cli.crc_over_stx {
        CrcScope::IncludeStx
    } else {
        CrcScope::ExcludeStx
    }
}

fn codec(cli: &Cli) -> FrameCodec {
    FrameCodec::new(cli.stx).with_crc_scope(crc_scope(cli))
}

/// A missing data argument means an empty payload.
fn data_value(data: Option<&str>) -> Value {
    data.map(Value::from).unwrap_or_default()
}

/// Construct a sender from CLI arguments. With `--mock`, the transport is
/// scripted to echo `frame` back `echoes` times.
async fn create_sender(cli: &Cli, frame: &[u8], echoes: usize) -> Result<CommandSender> {
    let builder = SenderBuilder::new()
        .baud_rate(cli.baud)
        .stx(cli.stx)
        .crc_scope(crc_scope(cli))
        .read_timeout(Duration::from_millis(cli.timeout_ms))
        .settle_delay(Duration::from_millis(cli.settle_ms));

    if cli.mock {
        if cli.port.is_some() {
            bail!("--port cannot be combined with --mock");
        }
        let mut mock = MockTransport::new();
        for _ in 0..echoes {
            mock.expect(frame, frame);
        }
        let sender = builder
            .build_with_transport(Box::new(mock))
            .await
            .context("failed to build sender with mock transport")?;
        println!("Connected (mock loopback transport)");
        return Ok(sender);
    }

    let port = cli
        .port
        .as_deref()
        .context("--port is required when not using --mock")?;
    let sender = builder
        .serial_port(port)
        .build()
        .await
        .with_context(|| format!("failed to open serial port {port} at {} baud", cli.baud))?;
    println!("Connected to {port} at {} baud", cli.baud);
    Ok(sender)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_build(cli: &Cli, addr: &str, cmd: &str, data: Option<&str>) -> Result<()> {
    let frame = codec(cli)
        .build(addr, cmd, data_value(data))
        .context("failed to build frame")?;
    println!("{}", hex_string(&frame));
    Ok(())
}

fn cmd_parse(cli: &Cli, hex: &str) -> Result<()> {
    let bytes = picolink::parse_hex_bytes(hex).context("invalid hex input")?;
    let frame = codec(cli).parse(&bytes).context("invalid frame")?;
    println!("Frame");
    println!("  ADDR:     0x{:02X}", frame.addr);
    println!("  CMD:      0x{:02X}", frame.cmd);
    println!("  LEN:      {}", frame.payload.len() + 2);
    println!("  PAYLOAD:  {}", format_payload(&frame.payload));
    if bytes.len() > frame.encoded_len() {
        println!(
            "  ({} trailing bytes ignored)",
            bytes.len() - frame.encoded_len()
        );
    }
    Ok(())
}

async fn cmd_send(
    sender: &mut CommandSender,
    addr: &str,
    cmd: &str,
    data: Option<&str>,
    repeat: u32,
    interval: Duration,
) -> Result<()> {
    for i in 0..repeat {
        if i > 0 {
            tokio::time::sleep(interval).await;
        }
        let tx = sender
            .send(addr, cmd, data_value(data))
            .await
            .context("send failed")?;
        println!("TX: {}", hex_string(&tx));

        let rx = sender.read_any(256).await.context("read failed")?;
        if rx.is_empty() {
            println!("RX: <no response>");
        } else {
            println!("RX: {}", hex_string(&rx));
        }
    }
    Ok(())
}

async fn cmd_transact(
    sender: &mut CommandSender,
    addr: &str,
    cmd: &str,
    data: Option<&str>,
) -> Result<()> {
    match sender.transact(addr, cmd, data_value(data)).await {
        Ok(reply) => {
            println!(
                "Reply: ADDR 0x{:02X} CMD 0x{:02X} PAYLOAD {}",
                reply.addr,
                reply.cmd,
                format_payload(&reply.payload)
            );
            Ok(())
        }
        Err(Error::Timeout) => {
            println!("Reply: <no response>");
            Ok(())
        }
        Err(e) => Err(e).context("transaction failed"),
    }
}

fn format_payload(payload: &[u8]) -> String {
    if payload.is_empty() {
        "<empty>".to_string()
    } else {
        hex_string(payload)
    }
}
