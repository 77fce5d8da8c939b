mod app;
mod camera;
mod input;
mod renderer;
mod ui;

fn main() {
    app::run();
}
