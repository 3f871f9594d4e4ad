/// Gamepad navigation through gilrs.
///
/// Face and shoulder buttons are bound per action in `[gamepad]` of
/// config.toml; the d-pad and the left stick are fixed:
///   ←→  Back / Continue
///   ↑↓  Focus previous / next node
/// Without the `gamepad` feature the tracker exists but never reports.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Bindable buttons.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PadButton {
    South,
    East,
    West,
    North,
    LeftShoulder,
    RightShoulder,
    LeftTrigger,
    RightTrigger,
    Start,
    Select,
}

/// Config spellings per button, matched case-insensitively.
const BUTTON_NAMES: &[(PadButton, &[&str])] = &[
    (PadButton::South, &["A", "SOUTH"]),
    (PadButton::East, &["B", "EAST"]),
    (PadButton::West, &["X", "WEST"]),
    (PadButton::North, &["Y", "NORTH"]),
    (PadButton::LeftShoulder, &["L1", "LB"]),
    (PadButton::RightShoulder, &["R1", "RB"]),
    (PadButton::LeftTrigger, &["L2", "LT"]),
    (PadButton::RightTrigger, &["R2", "RT"]),
    (PadButton::Start, &["START"]),
    (PadButton::Select, &["SELECT", "BACK"]),
];

impl PadButton {
    pub fn parse(name: &str) -> Option<PadButton> {
        let upper = name.trim().to_uppercase();
        BUTTON_NAMES
            .iter()
            .find(|(_, names)| names.contains(&upper.as_str()))
            .map(|(button, _)| *button)
    }
}

#[cfg(feature = "gamepad")]
fn classify(button: Button) -> Option<Press> {
    let press = match button {
        Button::DPadUp => Press::Action(PadAction::FocusPrev),
        Button::DPadDown => Press::Action(PadAction::FocusNext),
        Button::DPadLeft => Press::Action(PadAction::Back),
        Button::DPadRight => Press::Action(PadAction::Continue),
        Button::South => Press::Bound(PadButton::South),
        Button::East => Press::Bound(PadButton::East),
        Button::West => Press::Bound(PadButton::West),
        Button::North => Press::Bound(PadButton::North),
        Button::LeftTrigger => Press::Bound(PadButton::LeftShoulder),
        Button::RightTrigger => Press::Bound(PadButton::RightShoulder),
        Button::LeftTrigger2 => Press::Bound(PadButton::LeftTrigger),
        Button::RightTrigger2 => Press::Bound(PadButton::RightTrigger),
        Button::Start => Press::Bound(PadButton::Start),
        Button::Select => Press::Bound(PadButton::Select),
        _ => return None,
    };
    Some(press)
}

#[cfg(feature = "gamepad")]
enum Press {
    Action(PadAction),
    Bound(PadButton),
}

/// What a press means to the navigator.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PadAction {
    Continue,
    Back,
    Close,
    StartOver,
    Overview,
    FocusPrev,
    FocusNext,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Bindings {
    table: Vec<(PadAction, Vec<PadButton>)>,
}

impl Bindings {
    /// Unknown names are skipped; a list with nothing usable keeps the
    /// built-in binding for that action.
    fn from_config(cfg: &GamepadConfig) -> Self {
        let defaults = GamepadConfig::default();
        let lists = [
            (PadAction::Continue, &cfg.advance, &defaults.advance),
            (PadAction::Back, &cfg.back, &defaults.back),
            (PadAction::Close, &cfg.close, &defaults.close),
            (PadAction::StartOver, &cfg.start_over, &defaults.start_over),
            (PadAction::Overview, &cfg.overview, &defaults.overview),
        ];
        let table = lists
            .into_iter()
            .map(|(action, names, fallback)| {
                let mut buttons = parse_all(names);
                if buttons.is_empty() {
                    if !names.is_empty() {
                        log::warn!("no usable gamepad buttons for {action:?}: {names:?}");
                    }
                    buttons = parse_all(fallback);
                }
                (action, buttons)
            })
            .collect();
        Bindings { table }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn actions_for(&self, button: PadButton) -> impl Iterator<Item = PadAction> + '_ {
        self.table
            .iter()
            .filter(move |(_, buttons)| buttons.contains(&button))
            .map(|(action, _)| *action)
    }
}

fn parse_all(names: &[String]) -> Vec<PadButton> {
    names.iter().filter_map(|n| PadButton::parse(n)).collect()
}

/// Turns analog stick positions into one-shot directional actions.
#[derive(Clone, Copy, Debug, Default)]
struct StickEdges {
    x: f32,
    y: f32,
    held: [bool; 4],
}

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
impl StickEdges {
    const ACTIONS: [PadAction; 4] = [
        PadAction::Back,
        PadAction::Continue,
        PadAction::FocusPrev,
        PadAction::FocusNext,
    ];

    /// Actions whose direction just crossed the deadzone.
    fn edges(&mut self) -> Vec<PadAction> {
        let now = [
            self.x < -STICK_DEADZONE,
            self.x > STICK_DEADZONE,
            self.y > STICK_DEADZONE,
            self.y < -STICK_DEADZONE,
        ];
        let fired = (0..4)
            .filter(|&i| now[i] && !self.held[i])
            .map(|i| StickEdges::ACTIONS[i])
            .collect();
        self.held = now;
        fired
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    stick: StickEdges,
    bindings: Bindings,
    /// Actions triggered during the last `update()`, in order.
    pressed: Vec<PadAction>,
    pub connected: bool,
}

impl GamepadState {
    pub fn new(cfg: &GamepadConfig) -> Self {
        #[cfg(feature = "gamepad")]
        let gilrs = Gilrs::new()
            .map_err(|e| log::info!("gamepad support unavailable: {e}"))
            .ok();
        #[cfg(feature = "gamepad")]
        let connected = gilrs.as_ref().map_or(false, |g| g.gamepads().next().is_some());
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs,
            stick: StickEdges::default(),
            bindings: Bindings::from_config(cfg),
            pressed: Vec::new(),
            connected,
        }
    }

    pub fn update(&mut self) {
        self.pressed.clear();
        #[cfg(feature = "gamepad")]
        self.poll();
    }

    /// Actions pressed since the previous `update()`.
    pub fn actions(&self) -> &[PadAction] {
        &self.pressed
    }

    #[cfg(feature = "gamepad")]
    fn poll(&mut self) {
        let Some(gilrs) = self.gilrs.as_mut() else {
            return;
        };
        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(button, _) => {
                    self.connected = true;
                    match classify(button) {
                        Some(Press::Action(action)) => self.pressed.push(action),
                        Some(Press::Bound(b)) => {
                            let actions: Vec<_> = self.bindings.actions_for(b).collect();
                            self.pressed.extend(actions);
                        }
                        None => {}
                    }
                }
                EventType::AxisChanged(Axis::LeftStickX, value, _) => self.stick.x = value,
                EventType::AxisChanged(Axis::LeftStickY, value, _) => self.stick.y = value,
                EventType::Connected => {
                    log::info!("gamepad connected");
                    self.connected = true;
                }
                EventType::Disconnected => {
                    log::info!("gamepad disconnected");
                    self.connected = false;
                    self.stick = StickEdges::default();
                }
                _ => {}
            }
        }
        let edges = self.stick.edges();
        self.pressed.extend(edges);
    }
}
