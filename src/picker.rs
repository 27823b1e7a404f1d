//! Interactive repository picker: type to filter, Enter to select.
//!
//! A thin presentation layer over discovery output. Filtering is a
//! case-insensitive subsequence match, ranked so that earlier and tighter
//! matches sort first.

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::discovery::Repo;

/// Score a candidate against a query; `None` when the query is not a
/// subsequence of the candidate. Lower scores rank earlier: matches that
/// start sooner and have smaller gaps win.
pub fn subsequence_score(candidate: &str, query: &str) -> Option<u32> {
    if query.is_empty() {
        return Some(0);
    }

    let candidate: Vec<char> = candidate.to_lowercase().chars().collect();
    let mut score = 0u32;
    let mut pos = 0usize;
    let mut first_match = None;

    for qc in query.to_lowercase().chars() {
        let found = candidate[pos..].iter().position(|&c| c == qc)?;
        let index = pos + found;
        if first_match.is_none() {
            first_match = Some(index as u32);
        } else {
            score += found as u32; // gap since the previous matched char
        }
        pos = index + 1;
    }

    // Starting position dominates: prefix matches beat scattered ones
    Some(first_match.unwrap_or(0) * 16 + score)
}

/// Indices into `repos`, filtered by `query` and ranked by score.
pub fn filter_ranked(repos: &[Repo], query: &str) -> Vec<usize> {
    let mut scored: Vec<(u32, usize)> = repos
        .iter()
        .enumerate()
        .filter_map(|(i, repo)| subsequence_score(&repo.name, query).map(|s| (s, i)))
        .collect();
    scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| repos[a.1].name.cmp(&repos[b.1].name)));
    scored.into_iter().map(|(_, i)| i).collect()
}

/// Picker state: the full repo list plus the current filter view.
pub struct Picker {
    repos: Vec<Repo>,
    query: String,
    filtered: Vec<usize>,
    selected: usize,
    list_state: ListState,
}

impl Picker {
    pub fn new(repos: Vec<Repo>) -> Self {
        let filtered = (0..repos.len()).collect();
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            repos,
            query: String::new(),
            filtered,
            selected: 0,
            list_state,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selected_repo(&self) -> Option<&Repo> {
        self.filtered
            .get(self.selected)
            .and_then(|&i| self.repos.get(i))
    }

    pub fn matches(&self) -> usize {
        self.filtered.len()
    }

    pub fn push_char(&mut self, c: char) {
        self.query.push(c);
        self.refilter();
    }

    pub fn pop_char(&mut self) {
        self.query.pop();
        self.refilter();
    }

    fn refilter(&mut self) {
        self.filtered = filter_ranked(&self.repos, &self.query);
        self.selected = 0;
        self.list_state.select(Some(0));
    }

    pub fn select_next(&mut self) {
        if !self.filtered.is_empty() {
            self.selected = (self.selected + 1) % self.filtered.len();
            self.list_state.select(Some(self.selected));
        }
    }

    pub fn select_prev(&mut self) {
        if !self.filtered.is_empty() {
            self.selected = self
                .selected
                .checked_sub(1)
                .unwrap_or(self.filtered.len() - 1);
            self.list_state.select(Some(self.selected));
        }
    }

    fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(1)])
            .split(frame.area());

        let input = Paragraph::new(Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Cyan)),
            Span::raw(self.query.clone()),
        ]))
        .block(
            Block::default()
                .title(format!(" repositories ({}) ", self.matches()))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(input, chunks[0]);

        let items: Vec<ListItem> = self
            .filtered
            .iter()
            .filter_map(|&i| self.repos.get(i))
            .map(|repo| {
                ListItem::new(Line::from(vec![
                    Span::raw(repo.name.clone()),
                    Span::raw("  "),
                    Span::styled(
                        format!("[{}]", repo.origin()),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, chunks[1], &mut self.list_state);
    }
}

/// Run the picker; returns the chosen repository, or `None` on cancel.
pub fn run(repos: Vec<Repo>) -> Result<Option<Repo>> {
    let mut picker = Picker::new(repos);
    let mut terminal = ratatui::init();

    let result = loop {
        terminal.draw(|frame| picker.render(frame))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Esc => break None,
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break None,
                KeyCode::Enter => break picker.selected_repo().cloned(),
                KeyCode::Down => picker.select_next(),
                KeyCode::Up => picker.select_prev(),
                KeyCode::Backspace => picker.pop_char(),
                KeyCode::Char(c) => picker.push_char(c),
                _ => {}
            }
        }
    };

    ratatui::restore();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(name: &str) -> Repo {
        Repo {
            name: name.to_string(),
            path: None,
            clone_url: None,
        }
    }

    #[test]
    fn test_score_requires_subsequence() {
        assert!(subsequence_score("roster", "rst").is_some());
        assert!(subsequence_score("roster", "xyz").is_none());
        assert!(subsequence_score("roster", "retsor").is_none());
    }

    #[test]
    fn test_score_case_insensitive() {
        assert_eq!(
            subsequence_score("MyRepo", "myrepo"),
            subsequence_score("myrepo", "myrepo")
        );
    }

    #[test]
    fn test_prefix_beats_scattered_match() {
        let prefix = subsequence_score("api-server", "api").unwrap();
        let scattered = subsequence_score("kapri", "api").unwrap();
        assert!(prefix < scattered);
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let repos = vec![repo("alpha"), repo("beta")];
        assert_eq!(filter_ranked(&repos, "").len(), 2);
    }

    #[test]
    fn test_filter_ranks_tighter_match_first() {
        let repos = vec![repo("dotfiles"), repo("docs"), repo("backend")];
        let ranked = filter_ranked(&repos, "do");
        // Both "docs" and "dotfiles" start with "do"; ties break by name
        assert_eq!(ranked.len(), 2);
        assert_eq!(repos[ranked[0]].name, "docs");
        assert_eq!(repos[ranked[1]].name, "dotfiles");
    }

    #[test]
    fn test_navigation_wraps() {
        let mut picker = Picker::new(vec![repo("a"), repo("b"), repo("c")]);

        picker.select_prev();
        assert_eq!(picker.selected_repo().unwrap().name, "c");

        picker.select_next();
        assert_eq!(picker.selected_repo().unwrap().name, "a");
    }

    #[test]
    fn test_typing_refilters_and_resets_selection() {
        let mut picker = Picker::new(vec![repo("alpha"), repo("beta"), repo("gamma")]);
        picker.select_next();

        picker.push_char('b');
        assert_eq!(picker.matches(), 1);
        assert_eq!(picker.selected_repo().unwrap().name, "beta");

        picker.pop_char();
        assert_eq!(picker.matches(), 3);
    }

    #[test]
    fn test_no_match_leaves_no_selection() {
        let mut picker = Picker::new(vec![repo("alpha")]);
        picker.push_char('z');
        assert!(picker.selected_repo().is_none());
    }
}
