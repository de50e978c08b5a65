use sage_engine::{SceneKey, Vec2};
use tracing::debug;

use super::content::{EntityContent, NpcContent, OneOrMany, SceneContent};
use super::quiz::Quiz;
use super::state::{PersistentState, QuizId};

const DEFAULT_COMPLETED_LINE: &str = "I already solved that quiz.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntityKind {
    Npc,
    Collectible,
    Portal,
}

#[derive(Debug, Clone)]
pub(crate) struct Npc {
    pub(crate) name: String,
    pub(crate) quiz_id: QuizId,
    pub(crate) quiz: Option<Quiz>,
    pub(crate) completed_line: String,
    pub(crate) is_static: bool,
    pub(crate) image_key: Option<String>,
    dialog: Vec<String>,
    dialog_index: usize,
}

impl Npc {
    fn from_content(scene_key: &str, content: &NpcContent) -> Self {
        let completed_line = match &content.completed_dialog {
            Some(OneOrMany::One(line)) => line.clone(),
            Some(OneOrMany::Many(lines)) if !lines.is_empty() => lines.join("\n"),
            _ => DEFAULT_COMPLETED_LINE.to_string(),
        };
        Self {
            name: content.name.clone(),
            quiz_id: QuizId::for_npc(scene_key, &content.name),
            quiz: content.quiz.as_ref().map(Quiz::from_content),
            completed_line,
            is_static: content.is_static,
            image_key: content.image_name.clone(),
            dialog: content.dialog.clone(),
            dialog_index: 0,
        }
    }

    /// Hands out the next line of the current conversation.
    pub(crate) fn next_line(&mut self) -> Option<String> {
        let line = self.dialog.get(self.dialog_index).cloned()?;
        self.dialog_index += 1;
        Some(line)
    }

    pub(crate) fn has_more_lines(&self) -> bool {
        self.dialog_index < self.dialog.len()
    }

    #[cfg(test)]
    pub(crate) fn dialog_index(&self) -> usize {
        self.dialog_index
    }

    pub(crate) fn reset_dialog(&mut self) {
        self.dialog_index = 0;
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Collectible {
    pub(crate) item_name: String,
    pub(crate) item_id: String,
}

#[derive(Debug, Clone)]
pub(crate) struct Portal {
    pub(crate) target: SceneKey,
    pub(crate) entry_x: Option<f32>,
    pub(crate) confirm: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum EntityBody {
    Npc(Npc),
    Collectible(Collectible),
    Portal(Portal),
}

#[derive(Debug, Clone)]
pub(crate) struct Entity {
    pub(crate) position: Vec2,
    pub(crate) body: EntityBody,
    pub(crate) active: bool,
}

impl Entity {
    pub(crate) fn kind(&self) -> EntityKind {
        match self.body {
            EntityBody::Npc(_) => EntityKind::Npc,
            EntityBody::Collectible(_) => EntityKind::Collectible,
            EntityBody::Portal(_) => EntityKind::Portal,
        }
    }

    pub(crate) fn as_npc_mut(&mut self) -> Option<&mut Npc> {
        match &mut self.body {
            EntityBody::Npc(npc) => Some(npc),
            _ => None,
        }
    }

    /// Non-static NPCs turn to face `viewer_x`.
    pub(crate) fn sprite_key(&self, viewer_x: f32) -> String {
        match &self.body {
            EntityBody::Npc(npc) => {
                let key = npc
                    .image_key
                    .clone()
                    .unwrap_or_else(|| format!("npc:{}", npc.name));
                if !npc.is_static && viewer_x < self.position.x {
                    format!("{key}:flipped")
                } else {
                    key
                }
            }
            EntityBody::Collectible(item) => format!("item:{}", item.item_name),
            EntityBody::Portal(portal) => format!("portal:{}", portal.target),
        }
    }
}

/// Unique per placement, so the same item placed twice is collected twice.
pub(crate) fn collectible_id(scene_key: &str, item_name: &str, position: Vec2) -> String {
    format!("{scene_key}-{item_name}-{}-{}", position.x, position.y)
}

/// Instantiates a scene's entities in content order. Collectibles that were
/// already picked up are left out.
pub(crate) fn build_entities(
    scene_key: &str,
    content: &SceneContent,
    state: &PersistentState,
) -> Vec<Entity> {
    content
        .entities
        .iter()
        .filter_map(|entity| match entity {
            EntityContent::Npc(npc) => Some(Entity {
                position: Vec2::new(npc.x, npc.y),
                body: EntityBody::Npc(Npc::from_content(scene_key, npc)),
                active: true,
            }),
            EntityContent::Collectible(item) => {
                let position = Vec2::new(item.x, item.y);
                let item_id = collectible_id(scene_key, &item.item_name, position);
                if state.is_item_collected(&item_id) {
                    debug!(item = %item_id, "collectible_skipped");
                    return None;
                }
                Some(Entity {
                    position,
                    body: EntityBody::Collectible(Collectible {
                        item_name: item.item_name.clone(),
                        item_id,
                    }),
                    active: true,
                })
            }
            EntityContent::Portal(portal) => Some(Entity {
                position: Vec2::new(portal.x, portal.y),
                body: EntityBody::Portal(Portal {
                    target: SceneKey::new(portal.target_scene.clone()),
                    entry_x: portal.entry_x,
                    confirm: portal.confirm,
                }),
                active: true,
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scene() -> SceneContent {
        serde_json::from_value(json!({
            "entities": [
                {"type": "NPC", "x": 400, "y": 450, "name": "王国民", "dialog": ["a", "b"],
                 "completedDialog": ["もうクイズは解いたよ。"]},
                {"type": "Collectible", "x": 550, "y": 450, "itemName": "光る石"},
                {"type": "Portal", "x": 800, "y": 450, "targetScene": "Next", "entryX": 120}
            ]
        }))
        .expect("scene content")
    }

    #[test]
    fn collectible_id_uses_scene_item_and_position() {
        assert_eq!(
            collectible_id("Chapter1-1Scene", "光る石", Vec2::new(550.0, 450.0)),
            "Chapter1-1Scene-光る石-550-450"
        );
    }

    #[test]
    fn build_keeps_content_order_and_kinds() {
        let entities = build_entities("S", &scene(), &PersistentState::new());
        let kinds: Vec<EntityKind> = entities.iter().map(Entity::kind).collect();
        assert_eq!(
            kinds,
            vec![EntityKind::Npc, EntityKind::Collectible, EntityKind::Portal]
        );
        let EntityBody::Npc(npc) = &entities[0].body else {
            panic!("expected npc");
        };
        assert_eq!(npc.quiz_id, QuizId::for_npc("S", "王国民"));
        assert_eq!(npc.completed_line, "もうクイズは解いたよ。");
    }

    #[test]
    fn collected_items_are_not_instantiated_again() {
        let mut state = PersistentState::new();
        state.collect_item("S-光る石-550-450");
        let entities = build_entities("S", &scene(), &state);
        assert_eq!(entities.len(), 2);
        assert!(entities
            .iter()
            .all(|entity| entity.kind() != EntityKind::Collectible));
    }

    #[test]
    fn dialog_index_advances_and_resets() {
        let mut entities = build_entities("S", &scene(), &PersistentState::new());
        let npc = entities[0].as_npc_mut().expect("npc");
        assert_eq!(npc.next_line().as_deref(), Some("a"));
        assert!(npc.has_more_lines());
        assert_eq!(npc.next_line().as_deref(), Some("b"));
        assert_eq!(npc.next_line(), None);
        assert_eq!(npc.dialog_index(), 2);
        npc.reset_dialog();
        assert_eq!(npc.next_line().as_deref(), Some("a"));
    }

    #[test]
    fn only_non_static_npcs_face_the_player() {
        let entities = build_entities("S", &scene(), &PersistentState::new());
        assert_eq!(entities[0].sprite_key(100.0), "npc:王国民:flipped");
        assert_eq!(entities[0].sprite_key(700.0), "npc:王国民");

        let mut fixed = entities[0].clone();
        if let EntityBody::Npc(npc) = &mut fixed.body {
            npc.is_static = true;
        }
        assert_eq!(fixed.sprite_key(100.0), "npc:王国民");
        assert_eq!(entities[1].sprite_key(100.0), "item:光る石");
    }
}
