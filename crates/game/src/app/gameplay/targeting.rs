use sage_engine::Vec2;

use super::content::GameContent;
use super::entity::{Entity, EntityBody};

pub(crate) const INTERACTION_RADIUS: f32 = 100.0;
const PROMPT_OFFSET_Y: f32 = 80.0;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Prompt {
    pub(crate) text: &'static str,
    pub(crate) anchor: Vec2,
}

/// Index of the nearest active entity strictly inside the interaction radius.
/// Equal distances resolve to the entity listed first.
pub(crate) fn find_target(player: Vec2, entities: &[Entity]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, entity) in entities.iter().enumerate() {
        if !entity.active {
            continue;
        }
        let distance = player.distance(entity.position);
        if distance >= INTERACTION_RADIUS {
            continue;
        }
        if best.map_or(true, |(_, closest)| distance < closest) {
            best = Some((index, distance));
        }
    }
    best.map(|(index, _)| index)
}

pub(crate) fn prompt_for(entity: &Entity, content: &GameContent) -> Prompt {
    let text = match &entity.body {
        EntityBody::Npc(_) => "E/Enter: talk",
        EntityBody::Collectible(_) => "E/Enter: pick up",
        EntityBody::Portal(portal) if content.is_intro_chapter_scene(portal.target.as_str()) => {
            "E/Enter: next"
        }
        EntityBody::Portal(_) => "E/Enter: move",
    };
    Prompt {
        text,
        anchor: Vec2::new(entity.position.x, entity.position.y - PROMPT_OFFSET_Y),
    }
}
