use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes structured JSON logging. The log level is controlled
/// through the RUST_LOG environment variable and defaults to `info`.
/// `log`-crate records (actix's access logs) are bridged into tracing.
pub fn init_telemetry() {
    tracing_log::LogTracer::init().expect("Failed to set logger");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(formatting_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CaptureWriter {
        type Writer = CaptureWriter;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn log_records_are_bridged_into_tracing() {
        // Global logger may already be set by another test run.
        let _ = tracing_log::LogTracer::init();

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::fmt()
            .with_writer(CaptureWriter(buffer.clone()))
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            log::info!("access log line via log crate");
        });

        let output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(output.contains("access log line via log crate"));
    }
}
