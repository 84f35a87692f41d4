// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io::Read;

use depdoctor::core::EngineConfig;
use depdoctor::index::HttpIndexClient;
use depdoctor::report::Report;
use depdoctor::{normalize, resolver};

#[tokio::main]
async fn main() {
    // IMPORTANT: logs go to stderr, stdout is reserved for the JSON report.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .compact()
        .init();

    let code = run().await;
    std::process::exit(code);
}

async fn run() -> i32 {
    let args: Vec<String> = std::env::args().collect();

    let raw = match args.get(1) {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::error!("failed to read '{}': {}", path, e);
                return 1;
            }
        },
        None => {
            let mut buf = String::new();
            if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
                tracing::error!("failed to read stdin: {}", e);
                return 1;
            }
            buf
        }
    };

    let tree: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("input is not valid JSON: {}", e);
            return 1;
        }
    };

    let map = match normalize::build_dependency_map(&tree) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!("failed to normalize dependency tree: {}", e);
            return 1;
        }
    };

    let config = EngineConfig::default();
    if let Err(e) = config.validate() {
        tracing::error!("invalid configuration: {}", e);
        return 1;
    }

    let index = match HttpIndexClient::new(config.index_url.clone(), config.rate_limit_ms, config.request_timeout_ms) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("failed to build index client: {}", e);
            return 1;
        }
    };

    let (conflicts, plan) = match resolver::detect_and_resolve(&map, &index).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("resolution failed: {}", e);
            return 1;
        }
    };

    let report = Report::new(&conflicts, &plan);
    match report.to_json() {
        Ok(json) => print!("{}", json),
        Err(e) => {
            tracing::error!("failed to render report: {}", e);
            return 1;
        }
    }

    if conflicts.is_empty() {
        0
    } else {
        2
    }
}
