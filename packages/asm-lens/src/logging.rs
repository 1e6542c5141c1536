// Copyright (c) 2026 MCU-Debug Authors.
//
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

/// Logger setup. Everything goes to stderr so stdout stays clean for reports.
use flexi_logger::{FlexiLoggerError, Logger, LoggerHandle};

/// Environment variable holding a log spec, e.g. `asm_lens=debug`.
pub const LOG_ENV: &str = "ASM_LENS_LOG";

/// Spec used when neither `--debug` nor the environment say otherwise.
pub fn default_spec(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

/// Initialize the logger. Must be called once at startup; keep the handle
/// alive for the lifetime of the process.
///
/// `--debug` wins over the environment, otherwise `ASM_LENS_LOG` is used
/// when set.
pub fn init(debug: bool) -> Result<LoggerHandle, FlexiLoggerError> {
    let spec = match std::env::var(LOG_ENV) {
        Ok(from_env) if !debug && !from_env.trim().is_empty() => from_env,
        _ => default_spec(debug).to_string(),
    };
    Logger::try_with_str(spec)?
        .log_to_stderr()
        .format(flexi_logger::default_format)
        .start()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_picks_spec() {
        assert_eq!(default_spec(true), "debug");
        assert_eq!(default_spec(false), "info");
    }
}
