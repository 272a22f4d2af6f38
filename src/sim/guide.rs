/// The guide NPC and the final-stage choice.
///
/// ```text
/// Waiting ──(player within trigger)──▶ Cutscene ──(timer)──▶ Choosing
///                                                            │
///                                      befriend ◀────────────┤
///                                      betray   ◀────────────┘
/// ```
///
/// Befriended and Betrayed are terminal. A second choice is ignored.

use crate::domain::geometry::Rect;

pub const GUIDE_W: f32 = 24.0;
pub const GUIDE_H: f32 = 36.0;

pub const CUTSCENE_TEXT: &str = "Guide: You have done well... drink and be relieved...";
pub const CHOICE_TEXT: &str = "The guide offers you a choice: befriend (B) or oppose (F).";
pub const BEFRIEND_TEXT: &str = "You befriend the guide. They seem grateful.";
pub const BETRAY_TEXT: &str = "You attack the guide. They will not forget...";
pub const HELP_TEXT: &str = "The guide tends your wounds.";

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum GuidePhase {
    Waiting,
    Cutscene { until: f64 },
    Choosing,
    Befriended,
    Betrayed,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Choice {
    Befriend,
    Betray,
}

#[derive(Clone, Debug)]
pub struct Guide {
    pub rect: Rect,
    pub phase: GuidePhase,
}

impl Guide {
    pub fn new(x: f32, y: f32) -> Self {
        Guide { rect: Rect::new(x, y, GUIDE_W, GUIDE_H), phase: GuidePhase::Waiting }
    }

    /// Still standing in the level.
    pub fn is_present(&self) -> bool {
        !matches!(self.phase, GuidePhase::Befriended | GuidePhase::Betrayed)
    }

    pub fn is_choosing(&self) -> bool {
        self.phase == GuidePhase::Choosing
    }

    /// Advance the cutscene. Returns the line to show when the phase changes.
    pub fn update(&mut self, player: &Rect, now: f64, trigger: f32, duration: f64) -> Option<&'static str> {
        match self.phase {
            GuidePhase::Waiting => {
                let dx = player.center_x() - self.rect.center_x();
                let dy = player.center_y() - self.rect.center_y();
                if (dx * dx + dy * dy).sqrt() <= trigger {
                    self.phase = GuidePhase::Cutscene { until: now + duration };
                    return Some(CUTSCENE_TEXT);
                }
                None
            }
            GuidePhase::Cutscene { until } if now >= until => {
                self.phase = GuidePhase::Choosing;
                Some(CHOICE_TEXT)
            }
            _ => None,
        }
    }

    /// One-way choice. Returns `None` unless the guide is waiting on it.
    pub fn choose(&mut self, choice: Choice) -> Option<Choice> {
        if !self.is_choosing() {
            return None;
        }
        self.phase = match choice {
            Choice::Befriend => GuidePhase::Befriended,
            Choice::Betray => GuidePhase::Betrayed,
        };
        Some(choice)
    }
}
