use waterbox::app::runner;
use waterbox::app::WaterboxApp;

fn main() {
    env_logger::init();
    log::info!("starting waterbox");
    runner::run::<WaterboxApp>()
}
