#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    Submit,
    SwitchTab,
    SelectPrevious,
    SelectNext,
    ToggleSpeech,
    Listen,
    ToggleOverlay,
    Terminate,
    Quit,
}

const ACTION_COUNT: usize = 9;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
    pressed: [bool; ACTION_COUNT],
}

impl ActionStates {
    /// Records a key state change; a press only counts as an edge when the key was up.
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        let index = action.index();
        if is_down && !self.down[index] {
            self.pressed[index] = true;
        }
        self.down[index] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub(crate) fn was_pressed(&self, action: InputAction) -> bool {
        self.pressed[action.index()]
    }

    pub(crate) fn take_pressed(&mut self, action: InputAction) -> bool {
        let index = action.index();
        let was_pressed = self.pressed[index];
        self.pressed[index] = false;
        was_pressed
    }

    pub(crate) fn clear_edges(&mut self) {
        self.pressed = [false; ACTION_COUNT];
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::Submit => 0,
            InputAction::SwitchTab => 1,
            InputAction::SelectPrevious => 2,
            InputAction::SelectNext => 3,
            InputAction::ToggleSpeech => 4,
            InputAction::Listen => 5,
            InputAction::ToggleOverlay => 6,
            InputAction::Terminate => 7,
            InputAction::Quit => 8,
        }
    }
}

/// Text editing input in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEdit {
    Insert(char),
    Backspace,
}

#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    text_edits: Vec<TextEdit>,
    orbit_delta_px: (f32, f32),
    zoom_delta_steps: i32,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        text_edits: Vec<TextEdit>,
        orbit_delta_px: (f32, f32),
        zoom_delta_steps: i32,
        window_size: (u32, u32),
    ) -> Self {
        Self {
            quit_requested,
            actions,
            text_edits,
            orbit_delta_px,
            zoom_delta_steps,
            window_width: window_size.0,
            window_height: window_size.1,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    /// True only on the tick the key went down.
    pub fn pressed(&self, action: InputAction) -> bool {
        self.actions.was_pressed(action)
    }

    pub fn text_edits(&self) -> &[TextEdit] {
        &self.text_edits
    }

    pub fn orbit_delta_px(&self) -> (f32, f32) {
        self.orbit_delta_px
    }

    pub fn zoom_delta_steps(&self) -> i32 {
        self.zoom_delta_steps
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn with_pressed(mut self, action: InputAction) -> Self {
        self.actions.set(action, true);
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text_edits.extend(text.chars().map(TextEdit::Insert));
        self
    }

    pub fn with_backspaces(mut self, count: usize) -> Self {
        self.text_edits
            .extend(std::iter::repeat(TextEdit::Backspace).take(count));
        self
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }
}

/// Applies text edits to a single-line buffer.
pub fn apply_text_edits(buffer: &mut String, edits: &[TextEdit]) {
    for edit in edits {
        match edit {
            TextEdit::Insert(ch) => buffer.push(*ch),
            TextEdit::Backspace => {
                buffer.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_edge_only_when_key_was_up() {
        let mut states = ActionStates::default();
        states.set(InputAction::Submit, true);
        assert!(states.take_pressed(InputAction::Submit));

        states.set(InputAction::Submit, true);
        assert!(!states.take_pressed(InputAction::Submit));

        states.set(InputAction::Submit, false);
        states.set(InputAction::Submit, true);
        assert!(states.take_pressed(InputAction::Submit));
        assert!(states.is_down(InputAction::Submit));
    }

    #[test]
    fn builder_marks_pressed_actions() {
        let input = InputSnapshot::empty()
            .with_pressed(InputAction::Terminate)
            .with_text("hi");
        assert!(input.pressed(InputAction::Terminate));
        assert!(!input.pressed(InputAction::Submit));
        assert_eq!(
            input.text_edits(),
            &[TextEdit::Insert('h'), TextEdit::Insert('i')]
        );
    }

    #[test]
    fn text_edits_apply_in_order() {
        let mut buffer = "helo".to_string();
        apply_text_edits(
            &mut buffer,
            &[
                TextEdit::Backspace,
                TextEdit::Insert('l'),
                TextEdit::Insert('o'),
            ],
        );
        assert_eq!(buffer, "hello");
    }

    #[test]
    fn backspace_on_empty_buffer_is_harmless() {
        let mut buffer = String::new();
        apply_text_edits(&mut buffer, &[TextEdit::Backspace, TextEdit::Backspace]);
        assert!(buffer.is_empty());
    }
}
