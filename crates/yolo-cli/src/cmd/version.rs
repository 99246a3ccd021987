use crate::output::print_json;

pub const YOLO_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn run(json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&serde_json::json!({ "version": YOLO_VERSION }));
    }
    println!("yolo {YOLO_VERSION}");
    Ok(())
}
