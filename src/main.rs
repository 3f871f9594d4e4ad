/// Entry point and frame loop.

use std::time::Instant;

use pathways::app::App;
use pathways::config::AppConfig;
use pathways::domain::content::Content;
use pathways::error::Result;
use pathways::logging;
use pathways::ui::gamepad::GamepadState;
use pathways::ui::input::InputState;
use pathways::ui::renderer::Renderer;

fn main() {
    logging::init();
    if let Err(e) = run() {
        log::error!("{e}");
        eprintln!("pathways: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = AppConfig::load();
    let content = Content::load_or_embedded(config.content.as_deref())?;

    let mut renderer = Renderer::new();
    renderer.init()?;

    let (width, _) = renderer.size();
    let mut app = App::new(content, config, width);

    let result = frame_loop(&mut app, &mut renderer);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    result
}

fn frame_loop(app: &mut App, renderer: &mut Renderer) -> Result<()> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new(&app.config.gamepad);
    let frame = app.config.timing.frame();

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }

        let now = Instant::now();
        for ev in kb.events() {
            app.handle_input(ev, renderer.layout(), now);
        }
        for &action in gp.actions() {
            app.handle_pad(action, now);
        }
        if app.quit {
            break;
        }

        app.tick(now);

        // Compose, measure the laid-out frame, then draw connectors on top.
        renderer.render(app)?;
        app.measure_connectors(renderer.layout());
        renderer.present(app.connector_paths())?;

        std::thread::sleep(frame);
    }

    Ok(())
}
