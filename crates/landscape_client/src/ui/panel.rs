use landscape_core::events::EventSender;
use landscape_shared::settings::{
    LandscapeSettings, SettingChange, MAX_CLOUD_SPEED, MAX_RAIN_SPEED, MAX_TREES, MIN_CLOUD_SPEED,
    MIN_RAIN_SPEED, MIN_TREES,
};
use winit::keyboard::KeyCode;

const TREE_STEP: u32 = 10;
const RAIN_SPEED_STEP: f32 = 0.05;
const CLOUD_SPEED_STEP: f32 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelRow {
    Biome,
    Trees,
    RainSpeed,
    CloudSpeed,
    Rain,
}

impl PanelRow {
    pub const ALL: [PanelRow; 5] = [
        PanelRow::Biome,
        PanelRow::Trees,
        PanelRow::RainSpeed,
        PanelRow::CloudSpeed,
        PanelRow::Rain,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::Biome => "Biome",
            Self::Trees => "Number of Trees",
            Self::RainSpeed => "Rain Speed",
            Self::CloudSpeed => "Cloud Speed",
            Self::Rain => "Rain",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelLine {
    pub text: String,
    pub highlighted: bool,
}

/// Keyboard-driven settings panel. Each edit is sent as a [`SettingChange`]
/// and mirrored locally so repeated presses within one frame accumulate.
pub struct SettingsPanel {
    visible: bool,
    selected: usize,
    values: LandscapeSettings,
    sender: EventSender<SettingChange>,
}

impl SettingsPanel {
    pub fn new(sender: EventSender<SettingChange>, settings: &LandscapeSettings) -> Self {
        Self {
            visible: true,
            selected: 0,
            values: settings.clone(),
            sender,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn selected_row(&self) -> PanelRow {
        PanelRow::ALL[self.selected]
    }

    /// Re-reads the values after the landscape applied pending changes.
    pub fn sync(&mut self, settings: &LandscapeSettings) {
        self.values = settings.clone();
    }

    /// Press from the window. Auto-repeat adjusts sliders but never toggles.
    pub fn handle_key_press(&mut self, key: KeyCode, repeat: bool) -> bool {
        if repeat && key == KeyCode::F1 {
            return false;
        }
        self.handle_key(key)
    }

    /// Returns whether the key was consumed.
    pub fn handle_key(&mut self, key: KeyCode) -> bool {
        if key == KeyCode::F1 {
            self.toggle();
            return true;
        }
        if !self.visible {
            return false;
        }

        let rows = PanelRow::ALL.len();
        match key {
            KeyCode::ArrowUp => {
                self.selected = (self.selected + rows - 1) % rows;
                true
            }
            KeyCode::ArrowDown => {
                self.selected = (self.selected + 1) % rows;
                true
            }
            KeyCode::ArrowLeft => {
                self.adjust(-1);
                true
            }
            KeyCode::ArrowRight | KeyCode::Enter | KeyCode::Space => {
                self.adjust(1);
                true
            }
            _ => false,
        }
    }

    fn adjust(&mut self, direction: i32) {
        let Some(change) = self.change_for(direction) else {
            return;
        };
        self.values.apply(change);
        self.sender.emit(change);
    }

    fn change_for(&self, direction: i32) -> Option<SettingChange> {
        let values = &self.values;
        let change = match self.selected_row() {
            PanelRow::Biome => SettingChange::Biome(values.biome.cycle(direction)),
            PanelRow::Trees => {
                let trees = if direction < 0 {
                    values.trees.saturating_sub(TREE_STEP).max(MIN_TREES)
                } else {
                    (values.trees + TREE_STEP).min(MAX_TREES)
                };
                if trees == values.trees {
                    return None;
                }
                SettingChange::Trees(trees)
            }
            PanelRow::RainSpeed => {
                let speed = step_value(values.rain_speed, RAIN_SPEED_STEP, direction, MIN_RAIN_SPEED, MAX_RAIN_SPEED);
                if speed == values.rain_speed {
                    return None;
                }
                SettingChange::RainSpeed(speed)
            }
            PanelRow::CloudSpeed => {
                let speed =
                    step_value(values.cloud_speed, CLOUD_SPEED_STEP, direction, MIN_CLOUD_SPEED, MAX_CLOUD_SPEED);
                if speed == values.cloud_speed {
                    return None;
                }
                SettingChange::CloudSpeed(speed)
            }
            PanelRow::Rain => SettingChange::Rain(!values.rain),
        };
        Some(change)
    }

    pub fn lines(&self) -> Vec<PanelLine> {
        let mut lines = vec![PanelLine {
            text: "Settings (F1)".to_string(),
            highlighted: false,
        }];
        for (index, row) in PanelRow::ALL.iter().enumerate() {
            let highlighted = index == self.selected;
            let marker = if highlighted { '>' } else { ' ' };
            lines.push(PanelLine {
                text: format!("{marker} {}: {}", row.label(), self.value_text(*row)),
                highlighted,
            });
        }
        lines
    }

    fn value_text(&self, row: PanelRow) -> String {
        match row {
            PanelRow::Biome => self.values.biome.name().to_string(),
            PanelRow::Trees => self.values.trees.to_string(),
            PanelRow::RainSpeed => format!("{:.2}", self.values.rain_speed),
            PanelRow::CloudSpeed => format!("{:.3}", self.values.cloud_speed),
            PanelRow::Rain => String::from(if self.values.rain { "on" } else { "off" }),
        }
    }
}

/// Steps on a fixed grid so repeated presses do not accumulate float error.
fn step_value(value: f32, step: f32, direction: i32, min: f32, max: f32) -> f32 {
    let steps = (value / step).round() + direction.signum() as f32;
    (steps * step).clamp(min, max)
}
