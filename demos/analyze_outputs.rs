use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    corpus_noise::example_apps::run_analyze_outputs(std::env::args().skip(1))
}
