use anyhow::Context;
use brag_core::generator::StatementGenerator;
use std::path::Path;

pub fn run(root: &Path, port: u16, offline: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let generator = StatementGenerator::for_project(root, &config, offline)
        .context("failed to prepare generator")?;
    let root_buf = root.to_path_buf();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{port}"))
            .await
            .with_context(|| format!("failed to bind port {port}"))?;
        println!("brag API listening on http://127.0.0.1:{port}");
        tokio::select! {
            res = brag_server::serve_on(root_buf, generator, listener) => res,
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down.");
                Ok(())
            }
        }
    })
}
