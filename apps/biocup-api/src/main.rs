use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = biocup_api::Args::parse();

	biocup_api::run(args).await
}
