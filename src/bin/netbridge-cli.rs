use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use netbridge::addr::{serialize_address, Address, AddressBuffer, BinaryWriter, ElementWidth};
use netbridge::config::{IoConfig, ResolverConfig};
use netbridge::net::{
    ConnectResult, Endpoint, IoBridge, PendingTask, ReadResult, ResultQueue, Utf8Decoder,
    WriteResult,
};
use netbridge::protocol::{Family, Protocol, SocketType};
use netbridge::resolve::{Hints, ResolveFlags, Resolver};

#[derive(Parser)]
#[command(name = "netbridge-cli")]
#[command(about = "Resolution, connection and address-encoding diagnostics", long_about = None)]
struct Cli {
    /// Print machine-readable JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a host into (family, address, solution) candidates
    Resolve {
        /// Host to resolve; omit for the local literal.
        host: Option<String>,
        #[arg(short, long, default_value_t = 0)]
        port: u16,
        #[arg(long, default_value = "PF_UNSPEC")]
        family: Family,
        #[arg(long = "type", default_value = "SOCK_ANY")]
        socket_type: SocketType,
        #[arg(long, default_value = "IPPROTO_ANY")]
        protocol: Protocol,
        #[arg(long)]
        passive: bool,
        #[arg(long)]
        addrconfig: bool,
        #[arg(long)]
        prefer_ipv4: bool,
    },
    /// Connect through the I/O bridge, optionally send text and print the reply
    Connect {
        host: String,
        port: u16,
        #[arg(long)]
        send: Option<String>,
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
    },
    /// Show the persisted record and element buffer of an address literal
    Encode {
        literal: String,
        #[arg(short, long, default_value_t = 0)]
        port: u16,
        /// Element width in bits (8, 16, 32 or 64).
        #[arg(long, default_value_t = 8)]
        width: u32,
        #[arg(long)]
        hostname: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let output = match cli.command {
        Commands::Resolve {
            host,
            port,
            family,
            socket_type,
            protocol,
            passive,
            addrconfig,
            prefer_ipv4,
        } => {
            let mut flags = ResolveFlags::NONE;
            if passive {
                flags = flags | ResolveFlags::PASSIVE;
            }
            if addrconfig {
                flags = flags | ResolveFlags::ADDRCONFIG;
            }
            let hints = Hints::default()
                .family(family)
                .socket_type(socket_type)
                .protocol(protocol)
                .flags(flags);
            let resolver = Resolver::new(&ResolverConfig { prefer_ipv4 });
            let found = resolver.resolve(host.as_deref(), port, &hints)?;
            Value::Array(
                found
                    .iter()
                    .map(|r| {
                        json!({
                            "family": r.family.name(),
                            "address": r.address.to_presentation(),
                            "port": r.address.port(),
                            "hostname": r.address.hostname(),
                            "solution": [
                                r.solution.family.name(),
                                r.solution.socket_type.name(),
                                r.solution.protocol.name(),
                            ],
                        })
                    })
                    .collect(),
            )
        }
        Commands::Connect {
            host,
            port,
            send,
            timeout_ms,
        } => connect(&host, port, send, Duration::from_millis(timeout_ms))?,
        Commands::Encode {
            literal,
            port,
            width,
            hostname,
        } => {
            let width = ElementWidth::from_bits(width)
                .ok_or_else(|| format!("unsupported element width: {width}"))?;
            let mut address = Address::from_presentation(&literal, port)?;
            if let Some(hostname) = hostname {
                address = address.with_hostname(hostname);
            }
            let mut writer = BinaryWriter::new();
            serialize_address(&address, &mut writer)?;
            json!({
                "address": address.to_presentation(),
                "family": address.family().name(),
                "scope_id": address.scope_id(),
                "record": hex(writer.as_bytes()),
                "elements": elements(&address.to_buffer(width)?),
                "width": width.to_string(),
            })
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_plain(&output);
    }
    Ok(())
}

fn connect(
    host: &str,
    port: u16,
    send: Option<String>,
    timeout: Duration,
) -> Result<Value, Box<dyn std::error::Error>> {
    let bridge = IoBridge::start(&IoConfig {
        worker_threads: 1,
        ..IoConfig::default()
    })?;

    let connects: ResultQueue<ConnectResult> = ResultQueue::new();
    bridge.connect_host(host, port, PendingTask::new(1, &connects));
    let record = connects.pop_timeout(timeout).ok_or("connect timed out")?;
    let connection = match (record.error, record.connection) {
        (None, Some(connection)) => connection,
        (error, _) => return Err(error.unwrap_or_else(|| "connect failed".into()).into()),
    };

    let mut report = json!({
        "local": connection.local_address()?.to_presentation(),
        "peer": connection.peer_address()?.to_presentation(),
        "handle": connection.id().to_string(),
    });

    if let Some(text) = send {
        let writes: ResultQueue<WriteResult> = ResultQueue::new();
        let reads: ResultQueue<ReadResult<String>> = ResultQueue::new();
        connection.read(PendingTask::new(2, &reads), Utf8Decoder)?;
        connection.write(text, PendingTask::new(3, &writes));

        let written = writes.pop_timeout(timeout).ok_or("write timed out")?;
        if let Some(error) = written.error {
            return Err(error.into());
        }
        report["sent"] = json!(written.bytes_written);

        if let Some(reply) = reads.pop_timeout(timeout) {
            report["reply"] = json!(reply.payload);
            report["error"] = json!(reply.error);
        }
    }

    connection.close();
    Ok(report)
}

fn elements(buffer: &AddressBuffer) -> Vec<u64> {
    match buffer {
        AddressBuffer::U8(v) => v.iter().map(|&e| u64::from(e)).collect(),
        AddressBuffer::U16(v) => v.iter().map(|&e| u64::from(e)).collect(),
        AddressBuffer::U32(v) => v.iter().map(|&e| u64::from(e)).collect(),
        AddressBuffer::U64(v) => v.clone(),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn print_plain(value: &Value) {
    match value {
        Value::Array(items) => {
            for item in items {
                print_plain(item);
                println!();
            }
        }
        Value::Object(fields) => {
            for (key, field) in fields {
                match field {
                    Value::String(s) => println!("{key}: {s}"),
                    Value::Null => {}
                    other => println!("{key}: {other}"),
                }
            }
        }
        other => println!("{other}"),
    }
}
