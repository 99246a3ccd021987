use std::path::{Path, PathBuf};

pub fn run(root: &Path, port: u16, static_dir: Option<PathBuf>, no_open: bool) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let root_buf = root.to_path_buf();

    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
        let url = format!("http://localhost:{}", listener.local_addr()?.port());
        println!("YOLO graph for {} → {url}", root_buf.display());

        tokio::select! {
            res = yolo_server::serve_on(root_buf, static_dir, listener, !no_open) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    })
}
