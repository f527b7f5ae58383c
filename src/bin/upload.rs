use clap::Parser;
use s3_dir_upload::{cli::Cli, err, AwsStore, Config, Error, Uploader};
use snafu::ResultExt;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = cli.load_config()?.resolve()?;
    print_parameters(&cfg);
    cfg.validate()?;

    let s3 = AwsStore::from_config(&cfg).await;
    let uploader = Uploader::with_config(s3, &cfg);

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if let Err(error) = cancel_on(interrupted(), token).await {
            tracing::error!(%error, "cannot watch for interrupts");
        }
    });

    let result = uploader
        .run(
            cfg.data_path.clone(),
            |progress| println!("{}", progress),
            &cancel,
        )
        .await;
    match result {
        Ok(totals) => {
            println!(
                "Successfully uploaded {} files and {} bytes!",
                totals.files, totals.bytes
            );
            Ok(())
        }
        Err(aborted) => Err(aborted.into()),
    }
}

fn print_parameters(cfg: &Config) {
    println!("Starting upload job with the following parameters:");
    println!("   Endpoint:        {}", cfg.endpoint_url());
    println!("   Secure:          {}", cfg.secure);
    println!("   Region:          {}", cfg.region);
    println!("   AccessKeyID:     {}", cfg.access_key_id);
    println!(
        "   SecretAccessKey: {}",
        if cfg.secret_access_key.is_empty() {
            ""
        } else {
            "********"
        }
    );
    println!("   DataPath:        {}", cfg.data_path.display());
    println!("   BucketName:      {}", cfg.bucket_name);
}

/// Completes on SIGINT (Ctrl-C) or, on unix, SIGTERM.
async fn interrupted() -> Result<(), Error> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).context(err::Io {
            description: "installing SIGTERM handler",
        })?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.context(err::Io {
                description: "listening for Ctrl-C",
            })?,
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await.context(err::Io {
        description: "listening for Ctrl-C",
    })?;
    Ok(())
}

/// Cancel `cancel` once `signal` completes. If listening for the signal fails, the token is left
/// alone and the error returned.
async fn cancel_on<F>(signal: F, cancel: CancellationToken) -> Result<(), Error>
where
    F: Future<Output = Result<(), Error>>,
{
    signal.await?;
    tracing::warn!("interrupted, stopping after the current file");
    cancel.cancel();
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io;

    #[tokio::test]
    async fn signal_cancels_the_run() {
        let cancel = CancellationToken::new();
        cancel_on(async { Ok(()) }, cancel.clone()).await.unwrap();
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn failing_signal_listener_is_reported() {
        let cancel = CancellationToken::new();
        let failing = async {
            let error = io::Error::new(io::ErrorKind::Other, "no signals here");
            Err::<(), _>(error).context(err::Io {
                description: "listening for Ctrl-C",
            })
        };
        match cancel_on(failing, cancel.clone()).await {
            Err(Error::Io { description, .. }) => assert_eq!(description, "listening for Ctrl-C"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(!cancel.is_cancelled());
    }
}
