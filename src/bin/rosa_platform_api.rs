// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Executable program to run the regional platform API

use rosa_platform_api::run_server;
use rosa_platform_api::Config;
use std::env;
use std::process::exit;

#[tokio::main]
async fn main() {
    if let Err(message) = do_run().await {
        eprintln!("{}", message);
        exit(1);
    }
}

async fn do_run() -> Result<(), String> {
    let args = env::args().collect::<Vec<_>>();
    if args.len() != 2 {
        return Err(format!("usage: {} CONFIG_FILE", args[0]));
    }

    let config = Config::from_file(&args[1])
        .map_err(|error| format!("loading config: {}", error))?;
    run_server(&config).await
}
