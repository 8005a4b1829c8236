use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    corpus_noise::example_apps::run_inject_noise(std::env::args().skip(1))
}
