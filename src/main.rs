// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Ajaxguard CLI - Network Error Interception
//!
//! Instruments a window backed by the real HTTP client, issues one request
//! through the selected primitives and prints the resulting error records.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use url::Url;

use ajaxguard::{
    AjaxErrorDispatcher, FanoutSink, HttpClient, HttpSink, JsValue, LibraryKind, MemorySink,
    ReportContext, TracingSink, Window,
};

/// Time given to detached beacon uploads before the process exits
const UPLOAD_GRACE: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ajaxguard=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    match args[1].as_str() {
        "check" => {
            let options = match CheckOptions::parse(&args[2..]) {
                Ok(o) => o,
                Err(e) => {
                    eprintln!("{}", e);
                    eprintln!("Usage: ajaxguard check <url> [--mode fetch|ajax|all] [--method M] [--body JSON] [--report-url URL]");
                    return ExitCode::from(1);
                }
            };
            match check(options).await {
                Ok(0) => ExitCode::SUCCESS,
                Ok(_) => ExitCode::from(2),
                Err(e) => {
                    eprintln!("Check failed: {:#}", e);
                    ExitCode::from(1)
                }
            }
        }
        "--help" | "-h" | "help" => {
            print_usage();
            ExitCode::SUCCESS
        }
        "--version" | "-v" | "version" => {
            println!("ajaxguard {}", ajaxguard::VERSION);
            ExitCode::SUCCESS
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"Ajaxguard - Network Error Interception

USAGE:
    ajaxguard <COMMAND> [OPTIONS]

COMMANDS:
    check <url>     Request a URL through instrumented fetch/XMLHttpRequest
                    and print the error records it produced
    help            Show this help message
    version         Show version information

CHECK OPTIONS:
    --mode <fetch|ajax|all>   Primitives to instrument and exercise (default: all)
    --method <METHOD>         Request method (default: GET)
    --body <JSON>             Request body
    --report-url <URL>        Also post records to this collector

EXIT STATUS:
    0  no records, 1  usage or setup error, 2  records were produced

EXAMPLES:
    ajaxguard check https://example.com/missing
    ajaxguard check https://api.example.com/items --mode fetch --method POST --body '{{"name":"a"}}'
"#
    );
}

#[derive(Debug)]
struct CheckOptions {
    url: String,
    mode: LibraryKind,
    method: String,
    body: Option<String>,
    report_url: Option<String>,
}

impl CheckOptions {
    fn parse(args: &[String]) -> anyhow::Result<Self> {
        let mut url = None;
        let mut mode = LibraryKind::Unspecified;
        let mut method = "GET".to_string();
        let mut body = None;
        let mut report_url = None;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--mode" => mode = flag_value(&mut iter, arg)?.parse().unwrap_or_default(),
                "--method" => method = flag_value(&mut iter, arg)?.to_uppercase(),
                "--body" => body = Some(flag_value(&mut iter, arg)?.to_string()),
                "--report-url" => report_url = Some(flag_value(&mut iter, arg)?.to_string()),
                flag if flag.starts_with("--") => bail!("Unknown option: {}", flag),
                value if url.is_none() => url = Some(value.to_string()),
                value => bail!("Unexpected argument: {}", value),
            }
        }

        Ok(Self {
            url: url.context("Missing <url>")?,
            mode,
            method,
            body,
            report_url,
        })
    }
}

fn flag_value<'a>(iter: &mut std::slice::Iter<'a, String>, flag: &str) -> anyhow::Result<&'a str> {
    iter.next()
        .map(String::as_str)
        .with_context(|| format!("{} requires a value", flag))
}

/// Returns the number of records produced
async fn check(options: CheckOptions) -> anyhow::Result<usize> {
    let target = Url::parse(&options.url).with_context(|| format!("Invalid URL: {}", options.url))?;
    let client = HttpClient::new().context("Failed to create HTTP client")?;
    let window = Window::with_http_client(client.clone(), Some(target.clone()));

    let memory = MemorySink::new();
    let mut sink = FanoutSink::new()
        .with(Arc::new(memory.clone()))
        .with(Arc::new(TracingSink));
    let mut context = ReportContext::new().app_id("ajaxguard-cli");
    if let Some(ref report_url) = options.report_url {
        sink = sink.with(Arc::new(HttpSink::new(client)));
        context = context.report_url(report_url.as_str());
    }

    let dispatcher = AjaxErrorDispatcher::new(context, Arc::new(sink));
    let installed = dispatcher.handle_error(&window, options.mode);
    if !installed.any_installed() {
        bail!("Nothing was instrumented for mode {}", options.mode);
    }

    let body = options.body.clone().map(JsValue::from).unwrap_or(JsValue::Undefined);

    if installed.fetch.is_some() {
        let init = JsValue::object([("method", JsValue::from(options.method.as_str())), ("body", body.clone())]);
        match window.fetch(&[JsValue::from(target.as_str()), init]).await {
            Ok(response) => println!("fetch: {} {} ({})", response.status, response.status_text, response.url),
            Err(e) => println!("fetch: rejected: {}", e),
        }
    }

    if installed.xhr.is_some() {
        let xhr = window
            .xml_http_request()
            .context("XMLHttpRequest is not available")?;
        xhr.open(&[JsValue::from(options.method.as_str()), JsValue::from(target.as_str())])?;
        xhr.send(&[body])?;
        window.run_until_idle().await;
        println!("xhr: {} {} ({})", xhr.status(), xhr.status_text(), xhr.response_url());
    }

    if options.report_url.is_some() {
        tokio::time::sleep(UPLOAD_GRACE).await;
    }

    let records = memory.records();
    println!("\n=== Error Records ({}) ===", records.len());
    println!("{}", serde_json::to_string_pretty(&records)?);

    Ok(records.len())
}
