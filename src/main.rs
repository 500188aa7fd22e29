use std::any::Any;
use std::env;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use pollster::block_on;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

use crane_sim::app::WINDOW_TITLE;
use crane_sim::{
    key_name, print_final_state, ControlKey, ControlLoop, ForwardKinematics, InputScript,
    Renderer, Rig, SceneBinding, SceneGraph, WindowScene,
};

const USAGE: &str = "Usage: crane-sim [--rig <file.xml>] [--script <file>] [--headless] [--help]";

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;
    if options.help {
        print!("{}", help_text());
        return Ok(());
    }

    let rig = match &options.rig {
        Some(path) => {
            info!("loading rig from {path}");
            Rig::load(path)?
        }
        None => Rig::default(),
    };
    println!(
        "Loaded rig with {} parts ({} props)",
        rig.parts.len(),
        rig.props().count()
    );

    let script = options
        .script
        .as_deref()
        .map(InputScript::load)
        .transpose()?;

    if options.headless {
        return run_headless(&rig, script.as_ref());
    }

    match run_interactive(&rig, script.as_ref()) {
        Ok(()) => Ok(()),
        Err(err) if err.downcast_ref::<WindowInitError>().is_some() => {
            eprintln!(
                "{err}. Falling back to --headless mode (set DISPLAY or install a GPU driver to enable rendering)."
            );
            run_headless(&rig, script.as_ref())
        }
        Err(err) => Err(err),
    }
}

fn help_text() -> String {
    let mut text = format!("{USAGE}\n\nControls:\n");
    for key in ControlKey::ALL {
        text.push_str(&format!("  {:<11} {}\n", key.key_name(), key.description()));
    }
    text.push_str("  escape      quit\n");
    text
}

fn run_headless(rig: &Rig, script: Option<&InputScript>) -> Result<()> {
    let mut control = ControlLoop::new(ForwardKinematics::new(rig.geometry));
    control
        .start(SceneGraph::from_rig(rig))
        .context("failed to start control loop")?;

    if let Some(script) = script {
        println!("Replaying script ({} ticks)", script.total_ticks());
        replay(script, &mut control)?;
    }

    control.stop();
    print_final_state(&control);
    Ok(())
}

fn replay<B: SceneBinding>(script: &InputScript, control: &mut ControlLoop<B>) -> Result<()> {
    for line in script.run(control).context("script execution failed")? {
        println!("{line}");
    }
    Ok(())
}

fn run_interactive(rig: &Rig, script: Option<&InputScript>) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = CraneApp::new(rig.clone(), script.cloned());
    event_loop
        .run_app(&mut app)
        .context("event loop terminated abnormally")?;
    app.finish()
}

/// Window host: owns the control loop and ticks it once per redraw.
struct CraneApp {
    rig: Rig,
    script: Option<InputScript>,
    control: ControlLoop<WindowScene>,
    window: Option<Arc<Window>>,
    last_error: Option<anyhow::Error>,
}

impl CraneApp {
    fn new(rig: Rig, script: Option<InputScript>) -> Self {
        let control = ControlLoop::new(ForwardKinematics::new(rig.geometry));
        Self {
            rig,
            script,
            control,
            window: None,
            last_error: None,
        }
    }

    fn open_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(1280.0, 720.0));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );
        let renderer = block_on(Renderer::new(Arc::clone(&window)))
            .map_err(|err| WindowInitError::from_error("renderer", format!("{err:#}")))?;

        let size = window.inner_size();
        info!("window opened at {}x{}", size.width, size.height);

        let scene = WindowScene::new(SceneGraph::from_rig(&self.rig), renderer, &self.rig);
        self.control
            .start(scene)
            .context("failed to start control loop")?;
        self.window = Some(window);

        if let Some(script) = self.script.take() {
            replay(&script, &mut self.control)?;
        }
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        self.last_error = Some(err);
        event_loop.exit();
    }

    fn handle_keyboard(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.logical_key == Key::Named(NamedKey::Escape) {
            event_loop.exit();
            return;
        }
        if let Some(name) = key_name(&event.logical_key) {
            self.control.handle_key(&name, event.state.is_pressed());
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let previous = self.control.latest_snapshot();
        match self.control.tick() {
            Ok(Some(snapshot)) => {
                if snapshot != previous || self.control.tick_count() == 1 {
                    if let Some(window) = &self.window {
                        window.set_title(&format!("{WINDOW_TITLE} | {snapshot}"));
                    }
                }
            }
            Ok(None) => {}
            Err(err) => {
                error!("frame failed: {err:#}");
                self.fail(event_loop, err.into());
            }
        }
    }

    fn finish(mut self) -> Result<()> {
        if self.control.stop().is_some() {
            print_final_state(&self.control);
        }
        match self.last_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl ApplicationHandler for CraneApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.control.is_running() {
            return;
        }
        if let Err(err) = self.open_window(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(scene) = self.control.binding_mut() {
                    scene.resize(size.width, size.height);
                }
            }
            WindowEvent::Focused(false) => self.control.release_all(),
            WindowEvent::KeyboardInput { event, .. } => self.handle_keyboard(event_loop, &event),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

#[derive(Debug, Default, PartialEq)]
struct CliOptions {
    rig: Option<String>,
    script: Option<String>,
    headless: bool,
    help: bool,
}

impl CliOptions {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut options = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--rig" => options.rig = Some(Self::value(&mut args, "--rig")?),
                "--script" => options.script = Some(Self::value(&mut args, "--script")?),
                "--headless" => options.headless = true,
                "--help" | "-h" => options.help = true,
                other => {
                    return Err(anyhow!("Unknown argument: {other}. {USAGE}"));
                }
            }
        }
        Ok(options)
    }

    fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
        args.next()
            .filter(|value| !value.starts_with("--"))
            .ok_or_else(|| anyhow!("{flag} needs a file path. {USAGE}"))
    }
}
