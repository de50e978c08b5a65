use std::rc::Rc;

use sage_engine::{
    Countdown, Frame, InputAction, InputSnapshot, PointerEvent, Scene, SceneCommand, SceneKey,
    ScreenAnchor, UiTarget, Vec2,
};
use tracing::{debug, info};

use super::content::GameContent;
use super::dialog::{DialogController, DialogPhase};
use super::entity::{build_entities, Entity, EntityBody, Portal};
use super::notification::{NotificationQueue, TOAST_SECONDS};
use super::overlays::{portal_question, ConfirmChoice, ConfirmDialog, HelpModal};
use super::quiz::{QuizController, QuizResolution};
use super::state::PersistentState;
use super::targeting::{find_target, prompt_for};
use super::{SceneEntry, CHAPTER_SELECTION_SCENE};

const PLAYER_SPEED: f32 = 200.0;
const JUMP_VELOCITY: f32 = -500.0;
const GRAVITY: f32 = 1100.0;
const GROUND_Y: f32 = 450.0;
const DEFAULT_ENTRY_X: f32 = 100.0;
const FADE_SECONDS: f32 = 0.5;
const PLAYER_SPRITE: &str = "player";

#[derive(Debug, Clone, Copy)]
struct Player {
    position: Vec2,
    velocity: Vec2,
    grounded: bool,
}

#[derive(Debug)]
struct Transition {
    target: SceneKey,
    entry_x: Option<f32>,
    fade: Countdown,
}

/// One walkable scene built from content: the player, its entities and every
/// modal that can sit on top of them.
pub(crate) struct FieldScene {
    key: SceneKey,
    content: Rc<GameContent>,
    chapter_key: Option<String>,
    world_width: f32,
    background: Option<String>,
    entry_x: Option<f32>,
    player: Player,
    entities: Vec<Entity>,
    target: Option<usize>,
    dialog: DialogController,
    quiz: QuizController,
    notifications: NotificationQueue,
    help: Option<HelpModal>,
    confirm: Option<ConfirmDialog<Portal>>,
    speaking_npc: Option<usize>,
    transition: Option<Transition>,
}

impl FieldScene {
    /// `None` when `key` names no scene in the content.
    pub(crate) fn new(key: SceneKey, content: Rc<GameContent>, entry_x: Option<f32>) -> Option<Self> {
        let scene = content.scenes.get(key.as_str())?;
        let world_width = scene.world_width;
        let background = scene.background.clone();
        let chapter_key = content
            .chapter_of_scene(key.as_str())
            .map(|(chapter_key, _)| chapter_key.to_string());
        Some(Self {
            key,
            chapter_key,
            world_width,
            background,
            entry_x,
            player: Player {
                position: Vec2::new(DEFAULT_ENTRY_X, GROUND_Y),
                velocity: Vec2::ZERO,
                grounded: true,
            },
            entities: Vec::new(),
            target: None,
            dialog: DialogController::default(),
            quiz: QuizController::default(),
            notifications: NotificationQueue::default(),
            help: None,
            confirm: None,
            speaking_npc: None,
            transition: None,
            content,
        })
    }

    pub(crate) fn key(&self) -> &SceneKey {
        &self.key
    }

    #[cfg(test)]
    pub(crate) fn player_position(&self) -> Vec2 {
        self.player.position
    }

    pub(crate) fn target(&self) -> Option<&Entity> {
        self.target.and_then(|index| self.entities.get(index))
    }

    #[cfg(test)]
    pub(crate) fn entities(&self) -> &[Entity] {
        &self.entities
    }

    #[cfg(test)]
    pub(crate) fn dialog_phase(&self) -> DialogPhase {
        self.dialog.phase()
    }

    #[cfg(test)]
    pub(crate) fn dialog_text(&self) -> &str {
        self.dialog.visible_text()
    }

    #[cfg(test)]
    pub(crate) fn quiz(&self) -> &QuizController {
        &self.quiz
    }

    #[cfg(test)]
    pub(crate) fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    #[cfg(test)]
    pub(crate) fn is_help_open(&self) -> bool {
        self.help.is_some()
    }

    #[cfg(test)]
    pub(crate) fn is_confirm_open(&self) -> bool {
        self.confirm.is_some()
    }

    #[cfg(test)]
    pub(crate) fn toast_texts(&self) -> impl Iterator<Item = &str> {
        self.notifications.texts()
    }

    /// (done, required) for the quest tracker.
    pub(crate) fn quest_progress(&self, state: &PersistentState) -> (usize, u32) {
        match self.chapter_key.as_deref() {
            Some(chapter_key) => {
                let done = self
                    .content
                    .chapter_roster(chapter_key)
                    .iter()
                    .filter(|quiz_id| state.is_quiz_completed(quiz_id))
                    .count();
                let required = self
                    .content
                    .chapters
                    .get(chapter_key)
                    .map_or(state.total_quizzes(), |chapter| chapter.total_quizzes);
                (done, required)
            }
            None => (state.completed_count(), state.total_quizzes()),
        }
    }

    fn handle_input(
        &mut self,
        input: &InputSnapshot,
        state: &mut PersistentState,
    ) -> SceneCommand<SceneEntry> {
        if let Some(help) = self.help.as_mut() {
            if !help.handle_input(input) {
                self.help = None;
            }
            return SceneCommand::None;
        }
        if let Some(confirm) = &self.confirm {
            match confirm.handle_input(input) {
                Some(ConfirmChoice::Accept) => {
                    let portal = confirm.payload().clone();
                    self.confirm = None;
                    self.begin_transition(&portal);
                }
                Some(ConfirmChoice::Decline) => self.confirm = None,
                None => {}
            }
            return SceneCommand::None;
        }
        if self.quiz.is_open() {
            self.quiz.handle_input(input, state);
            if let Some(resolution) = self.quiz.take_resolution() {
                self.resume_after_quiz(resolution, state);
            }
            return SceneCommand::None;
        }

        if input.pressed(InputAction::Cancel) && self.dialog.is_active() {
            self.close_conversation();
            return SceneCommand::None;
        }
        if input.pressed(InputAction::Help) && !state.modal().is_open() {
            self.help = HelpModal::open(state.modal(), &self.content.help_pages);
            return SceneCommand::None;
        }
        if self.chapter_key.is_some()
            && !state.modal().is_open()
            && input.pointer() == Some(PointerEvent::Click(UiTarget::Close))
        {
            return SceneCommand::SwitchTo {
                key: SceneKey::new(CHAPTER_SELECTION_SCENE),
                entry: SceneEntry::Menu,
            };
        }
        if input.pressed(InputAction::Interact) {
            self.interact(state);
        }
        SceneCommand::None
    }

    fn interact(&mut self, state: &mut PersistentState) {
        match self.dialog.phase() {
            DialogPhase::Typing => return self.dialog.skip(),
            DialogPhase::AwaitingClose => return self.close_conversation(),
            DialogPhase::AwaitingAdvance => return self.advance_conversation(state),
            DialogPhase::Idle => {}
        }

        let Some(index) = self.target else {
            return;
        };
        let Some(entity) = self.entities.get(index) else {
            return;
        };
        match &entity.body {
            EntityBody::Portal(portal) => {
                let portal = portal.clone();
                if portal.confirm {
                    self.confirm =
                        ConfirmDialog::open(state.modal(), portal_question(&portal), portal);
                } else {
                    self.begin_transition(&portal);
                }
            }
            EntityBody::Npc(_) => self.talk_to(index, state),
            EntityBody::Collectible(_) => self.collect(index, state),
        }
    }

    fn talk_to(&mut self, index: usize, state: &mut PersistentState) {
        let Some(npc) = self.entities.get_mut(index).and_then(Entity::as_npc_mut) else {
            return;
        };
        if let Some(quiz) = &npc.quiz {
            if state.is_quiz_completed(&npc.quiz_id) {
                let stored = state.user_answer(&npc.quiz_id).map(<[char]>::to_vec);
                if let Err(err) = self.quiz.show_completed(
                    quiz.clone(),
                    npc.completed_line.clone(),
                    stored,
                    state.modal(),
                ) {
                    debug!(error = %err, npc = %npc.name, "completed_view_refused");
                }
                return;
            }
        }
        npc.reset_dialog();
        self.speaking_npc = Some(index);
        self.advance_conversation(state);
    }

    /// Shows the speaking NPC's next line, hands over to its quiz once the
    /// lines run out, or ends the conversation.
    fn advance_conversation(&mut self, state: &mut PersistentState) {
        let Some(npc) = self
            .speaking_npc
            .and_then(|index| self.entities.get_mut(index))
            .and_then(Entity::as_npc_mut)
        else {
            self.close_conversation();
            return;
        };
        let quiz_pending = npc.quiz.is_some() && !state.is_quiz_completed(&npc.quiz_id);

        if let Some(line) = npc.next_line() {
            let more_follows = npc.has_more_lines() || quiz_pending;
            if !self.dialog.open(state.modal(), &npc.name, &line, more_follows) {
                self.speaking_npc = None;
            }
            return;
        }

        let pending = match (&npc.quiz, quiz_pending) {
            (Some(quiz), true) => Some((npc.quiz_id.clone(), quiz.clone())),
            _ => None,
        };
        let Some((quiz_id, quiz)) = pending else {
            self.close_conversation();
            return;
        };
        // The speaking NPC stays set so the quiz outcome can end its conversation.
        self.dialog.close();
        if let Err(err) = self.quiz.start_quiz(quiz_id, quiz, state.modal()) {
            debug!(error = %err, "quiz_refused");
            self.close_conversation();
        }
    }

    fn resume_after_quiz(&mut self, resolution: QuizResolution, state: &mut PersistentState) {
        if let Some(correct) = resolution.outcome {
            state.complete_quiz(&resolution.quiz_id, correct);
        }
        info!(
            quiz = %resolution.quiz_id,
            outcome = ?resolution.outcome,
            completed = state.completed_count(),
            correct_answers = state.correct_answers(),
            "quiz_resolved"
        );
        self.close_conversation();
    }

    fn close_conversation(&mut self) {
        self.dialog.close();
        if let Some(npc) = self
            .speaking_npc
            .take()
            .and_then(|index| self.entities.get_mut(index))
            .and_then(Entity::as_npc_mut)
        {
            npc.reset_dialog();
        }
    }

    fn collect(&mut self, index: usize, state: &mut PersistentState) {
        let Some(entity) = self.entities.get_mut(index) else {
            return;
        };
        let EntityBody::Collectible(item) = &entity.body else {
            return;
        };
        if state.collect_item(&item.item_id) {
            info!(item = %item.item_id, scene = %self.key, "item_collected");
        }
        self.notifications
            .push(format!("Got {}!", item.item_name), TOAST_SECONDS);
        entity.active = false;
        self.target = None;
    }

    fn begin_transition(&mut self, portal: &Portal) {
        if self.transition.is_some() {
            return;
        }
        debug!(from = %self.key, to = %portal.target, "portal_entered");
        self.transition = Some(Transition {
            target: portal.target.clone(),
            entry_x: portal.entry_x,
            fade: Countdown::new(FADE_SECONDS),
        });
    }

    fn move_player(&mut self, dt: f32, input: &InputSnapshot) {
        let player = &mut self.player;
        player.velocity.x = 0.0;
        if input.is_down(InputAction::MoveLeft) {
            player.velocity.x -= PLAYER_SPEED;
        }
        if input.is_down(InputAction::MoveRight) {
            player.velocity.x += PLAYER_SPEED;
        }
        if input.pressed(InputAction::Jump) && player.grounded {
            player.velocity.y = JUMP_VELOCITY;
            player.grounded = false;
        }
        if !player.grounded {
            player.velocity.y += GRAVITY * dt;
        }

        player.position.x = (player.position.x + player.velocity.x * dt).clamp(0.0, self.world_width);
        player.position.y += player.velocity.y * dt;
        if player.position.y >= GROUND_Y {
            player.position.y = GROUND_Y;
            player.velocity.y = 0.0;
            player.grounded = true;
        }
    }

    fn freeze_player(&mut self) {
        self.player.velocity = Vec2::ZERO;
        self.player.position.y = GROUND_Y;
        self.player.grounded = true;
    }
}

impl Scene<PersistentState, SceneEntry> for FieldScene {
    fn load(&mut self, state: &mut PersistentState) {
        if let Some(scene) = self.content.scenes.get(self.key.as_str()) {
            self.entities = build_entities(self.key.as_str(), scene, state);
        }
        let x = self.entry_x.unwrap_or(DEFAULT_ENTRY_X).clamp(0.0, self.world_width);
        self.player.position = Vec2::new(x, GROUND_Y);
        debug!(
            scene = %self.key,
            entities = self.entities.len(),
            entry_x = x,
            "field_ready"
        );
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        state: &mut PersistentState,
    ) -> SceneCommand<SceneEntry> {
        self.dialog.tick(fixed_dt_seconds);
        self.notifications.tick(fixed_dt_seconds);

        if self.transition.is_some() {
            self.freeze_player();
        }
        if let Some(transition) = self.transition.as_mut() {
            if transition.fade.tick(fixed_dt_seconds) {
                return SceneCommand::SwitchTo {
                    key: transition.target.clone(),
                    entry: portal_entry(&transition.target, transition.entry_x),
                };
            }
            return SceneCommand::None;
        }

        let command = self.handle_input(input, state);
        if !matches!(command, SceneCommand::None) {
            return command;
        }

        if state.modal().is_open() || self.transition.is_some() {
            self.freeze_player();
            return SceneCommand::None;
        }
        self.move_player(fixed_dt_seconds, input);
        self.target = find_target(self.player.position, &self.entities);
        SceneCommand::None
    }

    fn render(&self, state: &PersistentState, frame: &mut Frame) {
        if let Some(background) = &self.background {
            frame.sprite(background.clone(), Vec2::ZERO);
        }
        for entity in self.entities.iter().filter(|entity| entity.active) {
            frame.sprite(entity.sprite_key(self.player.position.x), entity.position);
        }
        frame.sprite(PLAYER_SPRITE, self.player.position);

        if !state.modal().is_open() && self.transition.is_none() {
            if let Some(entity) = self.target() {
                let prompt = prompt_for(entity, &self.content);
                frame.label_world(prompt.anchor, prompt.text);
            }
        }

        let (done, required) = self.quest_progress(state);
        frame.label_screen(
            ScreenAnchor::TopLeft,
            format!("Teach the villagers about AI ({done}/{required})"),
        );
        if self.chapter_key.is_some() {
            frame.label_screen(ScreenAnchor::TopRight, "Back");
        }

        self.dialog.render(frame);
        self.quiz.render(frame);
        if let Some(help) = &self.help {
            help.render(frame);
        }
        if let Some(confirm) = &self.confirm {
            confirm.render(frame);
        }
        self.notifications.render(frame);
        if let Some(transition) = &self.transition {
            frame.fade(transition.fade.progress());
        }
    }

    fn unload(&mut self, _state: &mut PersistentState) {
        self.help = None;
        self.confirm = None;
        self.dialog.close();
        debug!(scene = %self.key, "field_unloaded");
    }

    fn debug_title(&self, state: &PersistentState) -> Option<String> {
        let modal = self
            .quiz
            .modal_kind()
            .or_else(|| state.modal().open_kind())
            .map_or_else(|| "none".to_string(), |kind| format!("{kind:?}"));
        let target = self
            .target()
            .map_or_else(|| "none".to_string(), |entity| format!("{:?}", entity.kind()));
        Some(format!(
            "{} | x={:.0} | target={target} | modal={modal}",
            self.key, self.player.position.x
        ))
    }
}

fn portal_entry(target: &SceneKey, entry_x: Option<f32>) -> SceneEntry {
    match SceneEntry::default_for(target) {
        SceneEntry::Field { .. } => SceneEntry::Field { entry_x },
        other => other,
    }
}
