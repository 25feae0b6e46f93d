use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "llmrelay", about = "Streaming translation between LLM chat dialects")]
pub(crate) struct Cli {
    #[arg(long, env = "LLMRELAY_HOST", default_value = "127.0.0.1")]
    pub(crate) host: String,
    #[arg(long, env = "LLMRELAY_PORT", default_value_t = 8788)]
    pub(crate) port: u16,
    /// Bounds provider invocation plus streaming for one request.
    #[arg(long, env = "LLMRELAY_REQUEST_TIMEOUT_SECS", default_value_t = 600)]
    pub(crate) request_timeout_secs: u64,
    /// Pause between words emitted by the `echo` provider.
    #[arg(long, env = "LLMRELAY_ECHO_DELAY_MS", default_value_t = 0)]
    pub(crate) echo_delay_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["llmrelay"]);
        assert_eq!(cli.host, "127.0.0.1");
        assert_eq!(cli.port, 8788);
        assert_eq!(cli.request_timeout_secs, 600);
        assert_eq!(cli.echo_delay_ms, 0);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from(["llmrelay", "--port", "9000", "--echo-delay-ms", "25"]);
        assert_eq!(cli.port, 9000);
        assert_eq!(cli.echo_delay_ms, 25);
    }
}
