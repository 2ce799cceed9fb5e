//! Send one command to a device and print the reply.
//!
//! # Requirements
//!
//! - A board running firmware that speaks the framed command protocol,
//!   attached over USB (`/dev/ttyACM0` on Linux, `COM8` on Windows)
//!
//! # Usage
//!
//! ```sh
//! cargo run -p picolink --example send_command -- /dev/ttyACM0
//! ```

use std::time::Duration;

use picolink::{SenderBuilder, hex_string};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let serial_port = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyACM0".to_string());

    println!("Opening {serial_port}...");

    let mut sender = SenderBuilder::new()
        .serial_port(&serial_port)
        .read_timeout(Duration::from_secs(1))
        .build()
        .await?;

    // Address 0x01, command 0x02, scalar payload 0 (sent as 00 00).
    for _ in 0..2 {
        let tx = sender.send(0x01, 0x02, 0x00).await?;
        println!("TX: {}", hex_string(&tx));

        let rx = sender.read_any(256).await?;
        if rx.is_empty() {
            println!("RX: <no response>");
        } else {
            println!("RX: {}", hex_string(&rx));
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    // A scalar payload goes out as a big-endian u16: 25 -> 00 19.
    let tx = sender.send("0x01", "0x10", 25).await?;
    println!("TX: {}", hex_string(&tx));

    sender.close().await?;
    Ok(())
}
