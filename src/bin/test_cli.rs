//! Interactive console harness: posts simulated Twilio webhook payloads to
//! a running bot instance and prints the extracted reply text.
//!
//! ```text
//! WEBHOOK_URL=http://localhost:3000/whatsapp cargo run --bin test-cli
//! ```

use std::env;
use std::io::{self, BufRead, Write};

use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;

// One fixed user number for the whole test session.
const USER_NUMBER: &str = "whatsapp:+573001234567";

lazy_static! {
    static ref BODY_RE: Regex =
        Regex::new(r"(?s)<Body>(.*?)</Body>").expect("TwiML body pattern should be valid");
}

/// Extract the message text from a TwiML response.
fn parse_twiml(twiml: &str) -> String {
    match BODY_RE.captures(twiml) {
        Some(captures) => unescape_xml(captures[1].trim()),
        None => "No se recibió una respuesta legible.".to_string(),
    }
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[tokio::main]
async fn main() -> Result<()> {
    let url =
        env::var("WEBHOOK_URL").unwrap_or_else(|_| "http://localhost:3000/whatsapp".to_string());
    let client = reqwest::Client::new();

    println!("--- Chat de Prueba Local ---");
    println!("Escribe tu mensaje y presiona Enter. Escribe \"exit\" para salir.\n");

    let stdin = io::stdin();
    loop {
        print!("Tú: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") {
            break;
        }

        let response = client
            .post(&url)
            .form(&[("From", USER_NUMBER), ("Body", message)])
            .send()
            .await;

        match response {
            Ok(response) => {
                let body = response.text().await?;
                println!("\nBot: {}\n", parse_twiml(&body));
            }
            Err(e) => eprintln!("Error al conectar con el servidor: {e}"),
        }
    }

    Ok(())
}
