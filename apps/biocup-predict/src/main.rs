use clap::Parser;

use biocup_predict::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	biocup_predict::run(args).await
}
