#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    gaze_recorder::run().await
}
