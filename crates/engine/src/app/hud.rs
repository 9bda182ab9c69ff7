//! Text panels the frontend hands to the renderer each frame.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HudTone {
    Normal,
    Dim,
    Accent,
    User,
    Bot,
    System,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HudPanelAnchor {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HudLine {
    pub text: String,
    pub tone: HudTone,
}

impl HudLine {
    pub fn new(text: impl Into<String>, tone: HudTone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }

    pub fn normal(text: impl Into<String>) -> Self {
        Self::new(text, HudTone::Normal)
    }

    pub fn blank() -> Self {
        Self::new(String::new(), HudTone::Normal)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HudPanel {
    pub anchor: HudPanelAnchor,
    pub title: Option<String>,
    pub lines: Vec<HudLine>,
    /// Lines longer than this are wrapped; `None` keeps them as is.
    pub wrap_chars: Option<usize>,
}

impl HudPanel {
    pub fn new(anchor: HudPanelAnchor) -> Self {
        Self {
            anchor,
            title: None,
            lines: Vec::new(),
            wrap_chars: None,
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn wrapped(mut self, wrap_chars: usize) -> Self {
        self.wrap_chars = Some(wrap_chars.max(1));
        self
    }

    pub fn push(&mut self, line: HudLine) {
        self.lines.push(line);
    }

    /// Lines as they will be drawn, after wrapping.
    pub fn layout_lines(&self) -> Vec<HudLine> {
        let mut laid_out = Vec::new();
        if let Some(title) = &self.title {
            laid_out.push(HudLine::new(title.clone(), HudTone::Accent));
        }
        for line in &self.lines {
            match self.wrap_chars {
                Some(width) => laid_out.extend(
                    wrap_text(&line.text, width)
                        .into_iter()
                        .map(|text| HudLine::new(text, line.tone)),
                ),
                None => laid_out.push(line.clone()),
            }
        }
        laid_out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hud {
    pub panels: Vec<HudPanel>,
}

impl Hud {
    pub fn push(&mut self, panel: HudPanel) {
        self.panels.push(panel);
    }
}

/// Greedy word wrap. Words longer than `width` are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word;
        while word.chars().count() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let split_at = word
                .char_indices()
                .nth(width)
                .map(|(index, _)| index)
                .unwrap_or(word.len());
            lines.push(word[..split_at].to_string());
            word = &word[split_at..];
        }
        if word.is_empty() {
            continue;
        }
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_breaks_on_word_boundaries() {
        assert_eq!(
            wrap_text("Connected to the AI.", 10),
            vec!["Connected", "to the AI."]
        );
    }

    #[test]
    fn wrap_splits_overlong_words() {
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn wrap_keeps_blank_line() {
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }

    #[test]
    fn layout_prepends_title_and_keeps_tone() {
        let mut panel = HudPanel::new(HudPanelAnchor::TopLeft)
            .titled("Chat")
            .wrapped(8);
        panel.push(HudLine::new("hello there friend", HudTone::Bot));

        let lines = panel.layout_lines();
        assert_eq!(lines[0], HudLine::new("Chat", HudTone::Accent));
        assert_eq!(lines.len(), 4);
        assert!(lines[1..].iter().all(|line| line.tone == HudTone::Bot));
    }
}
