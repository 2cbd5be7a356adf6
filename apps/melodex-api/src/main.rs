use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = melodex_api::Args::parse();
	melodex_api::run(args).await
}
