use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use typometer::scoring::Outcome;
use typometer::session::Status;

use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let session = &self.session;
        // styles
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
        let red_bold_style = Style::default()
            .patch(bold_style)
            .fg(Color::Red)
            .add_modifier(Modifier::UNDERLINED);
        let dim_bold_style = Style::default()
            .patch(bold_style)
            .add_modifier(Modifier::DIM);
        let underlined_dim_bold_style = Style::default()
            .patch(dim_bold_style)
            .add_modifier(Modifier::UNDERLINED);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(2), // title
                Constraint::Min(3),    // reference
                Constraint::Min(3),    // input
                Constraint::Length(1), // stats
                Constraint::Length(4), // results / notices
                Constraint::Length(1), // legend
            ])
            .split(area);

        Paragraph::new(Span::styled("Typing Speed Test", bold_style))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        // reference text, colored by the same comparison the score uses
        let reference: Vec<char> = session.reference().chars().collect();
        let outcomes = session.outcomes();
        let mut spans: Vec<Span> = reference
            .iter()
            .zip(outcomes.iter())
            .map(|(expected, outcome)| match outcome {
                Outcome::Correct => Span::styled(expected.to_string(), green_bold_style),
                _ => Span::styled(
                    match expected {
                        ' ' => "·".to_owned(),
                        c => c.to_string(),
                    },
                    red_bold_style,
                ),
            })
            .collect();
        let done = outcomes.len().min(reference.len());
        if let Some(next) = reference.get(done) {
            spans.push(Span::styled(next.to_string(), underlined_dim_bold_style));
            let rest: String = reference[done + 1..].iter().collect();
            spans.push(Span::styled(rest, dim_bold_style));
        }

        let max_chars_per_line = chunks[1].width.saturating_sub(2) as usize;
        let alignment = if session.reference().width() <= max_chars_per_line {
            // short references read better centred
            Alignment::Center
        } else {
            Alignment::Left
        };
        Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL))
            .alignment(alignment)
            .wrap(Wrap { trim: true })
            .render(chunks[1], buf);

        let input_title = match session.status() {
            Status::Idle => " start typing ",
            Status::Running => " typing ",
            Status::Completed => " done ",
        };
        Paragraph::new(session.typed())
            .block(Block::default().borders(Borders::ALL).title(input_title))
            .alignment(alignment)
            .wrap(Wrap { trim: false })
            .render(chunks[2], buf);

        let score = session.score();
        let stats = match &self.report {
            Some(report) => format!(
                "Time: {:.1}s   WPM: {:.2}   Accuracy: {:.1}%",
                report.result.elapsed_secs, report.result.wpm, report.result.accuracy
            ),
            None if session.status() == Status::Idle => {
                "Time: 0s   WPM: 0   Accuracy: 100%".to_string()
            }
            None => format!(
                "Time: {:.1}s   WPM: {:.2}   Accuracy: {:.1}%",
                session.elapsed_secs(),
                score.wpm,
                score.accuracy
            ),
        };
        Paragraph::new(Span::styled(stats, bold_style))
            .alignment(Alignment::Center)
            .render(chunks[3], buf);

        if let Some(report) = &self.report {
            let mut lines = vec![Line::from(Span::styled(
                format!(
                    "Your final score: {} wpm / {}% accuracy",
                    report.result.wpm, report.result.accuracy
                ),
                green_bold_style,
            ))];

            lines.push(match report.save_warning() {
                Some(warning) => Line::from(Span::styled(
                    warning,
                    Style::default().patch(bold_style).fg(Color::Red),
                )),
                None => Line::from(Span::styled("Progress saved.", italic_style)),
            });

            if self.mirror_enabled {
                lines.push(match (report.is_mirror_pending(), report.mirror_warning()) {
                    (true, _) => Line::from(Span::styled("Sending to dashboard...", italic_style)),
                    (false, Some(warning)) => Line::from(Span::styled(
                        warning,
                        Style::default().fg(Color::Yellow),
                    )),
                    (false, None) => Line::from(Span::styled(
                        "Sent to dashboard. Check your web dashboard!",
                        italic_style,
                    )),
                });
            }

            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .render(chunks[4], buf);
        }

        let legend = match self.state {
            AppState::Typing => "(←) restart / (→) new test / (esc) quit",
            AppState::Results => "(r)estart / (n)ew test / (esc) quit",
        };
        Paragraph::new(Span::styled(legend, italic_style))
            .alignment(Alignment::Center)
            .render(chunks[5], buf);
    }
}
