//! Player intents and the sources that produce them

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{MovementFlags, PlayerId, Rotation, TargetId, Vec3, BULLET_DAMAGE};
use std::collections::VecDeque;
use std::f32::consts::TAU;

/// Something the local player wants to do this tick
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Horizontal direction of travel; zero means standing still
    Move {
        direction: Vec3,
        rotation: Rotation,
        flags: MovementFlags,
    },
    Fire {
        direction: Vec3,
    },
    Reload,
    Chat(String),
    /// Local hit detection decided a shot connected with a target
    TargetHit {
        target_id: TargetId,
        damage: i32,
    },
    PlayerHit {
        player_id: PlayerId,
        damage: i32,
    },
}

/// What an input source may look at when deciding on intents
#[derive(Debug, Clone, Default)]
pub struct InputContext {
    pub position: Vec3,
    pub alive: bool,
    pub ammo: u32,
    pub total_ammo: u32,
    /// Targets the client currently believes are alive
    pub targets: Vec<(TargetId, Vec3)>,
}

pub trait InputSource {
    fn poll(&mut self, context: &InputContext) -> Vec<Intent>;
}

/// Wanders the arena, shoots at the nearest target and reloads when empty
pub struct BotInput {
    rng: StdRng,
    heading: f32,
    fire_chance: f64,
    hit_chance: f64,
    chat_chance: f64,
}

impl BotInput {
    pub fn new(seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let heading = rng.gen_range(0.0..TAU);
        Self {
            rng,
            heading,
            fire_chance: 0.05,
            hit_chance: 0.5,
            chat_chance: 0.001,
        }
    }

    fn nearest_target(context: &InputContext) -> Option<(TargetId, Vec3)> {
        context
            .targets
            .iter()
            .copied()
            .min_by(|a, b| {
                let da = a.1.distance(&context.position);
                let db = b.1.distance(&context.position);
                da.total_cmp(&db)
            })
    }
}

impl InputSource for BotInput {
    fn poll(&mut self, context: &InputContext) -> Vec<Intent> {
        let mut intents = Vec::new();
        if !context.alive {
            return intents;
        }

        self.heading = (self.heading + self.rng.gen_range(-0.3..0.3)).rem_euclid(TAU);
        // Steer back towards the middle when wandering too far out
        if context.position.x.abs() > 40.0 || context.position.z.abs() > 40.0 {
            self.heading = (-context.position.z).atan2(-context.position.x);
        }
        intents.push(Intent::Move {
            direction: Vec3::new(self.heading.cos(), 0.0, self.heading.sin()),
            rotation: Rotation::new(self.heading, 0.0),
            flags: MovementFlags {
                is_running: self.rng.gen_bool(0.2),
                ..MovementFlags::default()
            },
        });

        if context.ammo == 0 {
            if context.total_ammo > 0 {
                intents.push(Intent::Reload);
            }
        } else if self.rng.gen_bool(self.fire_chance) {
            match Self::nearest_target(context) {
                Some((target_id, target_position)) => {
                    let direction = (target_position - context.position).normalize();
                    intents.push(Intent::Fire { direction });
                    if self.rng.gen_bool(self.hit_chance) {
                        intents.push(Intent::TargetHit {
                            target_id,
                            damage: BULLET_DAMAGE,
                        });
                    }
                }
                None => intents.push(Intent::Fire {
                    direction: Vec3::new(self.heading.cos(), 0.0, self.heading.sin()),
                }),
            }
        }

        if self.rng.gen_bool(self.chat_chance) {
            intents.push(Intent::Chat("gg".to_string()));
        }

        intents
    }
}

/// Replays a fixed list of intent batches, one batch per poll
#[derive(Debug, Default)]
pub struct ScriptedInput {
    script: VecDeque<Vec<Intent>>,
}

impl ScriptedInput {
    pub fn new(script: Vec<Vec<Intent>>) -> Self {
        Self {
            script: script.into(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.script.is_empty()
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self, _context: &InputContext) -> Vec<Intent> {
        self.script.pop_front().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> InputContext {
        InputContext {
            position: Vec3::new(0.0, 2.0, 0.0),
            alive: true,
            ammo: 30,
            total_ammo: 1200,
            targets: vec![
                (1, Vec3::new(10.0, 2.0, 0.0)),
                (2, Vec3::new(-3.0, 2.0, 0.0)),
            ],
        }
    }

    #[test]
    fn test_dead_bot_does_nothing() {
        let mut bot = BotInput::new(Some(1));
        let ctx = InputContext {
            alive: false,
            ..context()
        };
        assert!(bot.poll(&ctx).is_empty());
    }

    #[test]
    fn test_bot_always_moves() {
        let mut bot = BotInput::new(Some(2));
        let intents = bot.poll(&context());
        assert!(matches!(intents[0], Intent::Move { .. }));
    }

    #[test]
    fn test_empty_bot_reloads_instead_of_firing() {
        let mut bot = BotInput::new(Some(3));
        let ctx = InputContext {
            ammo: 0,
            ..context()
        };
        for _ in 0..50 {
            let intents = bot.poll(&ctx);
            assert!(intents.contains(&Intent::Reload));
            assert!(!intents.iter().any(|i| matches!(i, Intent::Fire { .. })));
        }
    }

    #[test]
    fn test_bot_aims_at_nearest_target() {
        let mut bot = BotInput::new(Some(4));
        bot.fire_chance = 1.0;
        bot.hit_chance = 1.0;

        let intents = bot.poll(&context());
        assert!(intents.contains(&Intent::TargetHit {
            target_id: 2,
            damage: BULLET_DAMAGE
        }));
        let fired = intents.iter().find_map(|i| match i {
            Intent::Fire { direction } => Some(*direction),
            _ => None,
        });
        assert_eq!(fired.map(|d| d.x < 0.0), Some(true));
    }

    #[test]
    fn test_scripted_input_replays_in_order() {
        let mut input = ScriptedInput::new(vec![vec![Intent::Reload], vec![]]);
        assert_eq!(input.poll(&context()), vec![Intent::Reload]);
        assert!(input.poll(&context()).is_empty());
        assert!(input.is_finished());
        assert!(input.poll(&context()).is_empty());
    }
}
