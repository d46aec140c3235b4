use kf_client::crd::{Build, Source};
use kube::CustomResourceExt;
use std::io::Write;

fn main() -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();

    for crd in [Source::crd(), Build::crd()] {
        writeln!(stdout, "---")?;
        stdout.write_all(serde_yaml::to_string(&crd)?.as_bytes())?;
    }

    Ok(())
}
