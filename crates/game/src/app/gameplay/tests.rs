use std::rc::Rc;

use sage_engine::{
    parse_script, run_app, Frame, InputAction, InputSnapshot, LoopConfig, PointerEvent, Scene,
    SceneCommand, SceneKey, SceneMachine, ScriptedInput, StopReason, TraceRenderer, UiTarget,
};
use serde_json::json;

use super::chapter::{retry_chapter, ChapterProgressController};
use super::dialog::DialogPhase;
use super::entity::{EntityBody, EntityKind};
use super::field_scene::FieldScene;
use super::quiz::CompletedPage;
use super::state::{ModalKind, QuizId};
use super::*;

const DT: f32 = 1.0 / 60.0;

fn fixture() -> Rc<GameContent> {
    let content: GameContent = serde_json::from_value(json!({
        "introChapter": "chapter1",
        "startScene": "ChapterSelectionScene",
        "introStory": [{"text": "Once upon a time"}, {"text": "AI arrived"}],
        "helpPages": [{"text": "Move with A/D"}, {"text": "Talk with E"}],
        "scenes": {
            "Village": {
                "worldWidth": 960,
                "entities": [
                    {"type": "NPC", "x": 150, "y": 450, "name": "村人A",
                     "dialog": ["こんにちは", "AIについて教えて"],
                     "quiz": {"question": "生成AIとは?", "options": ["計算機", "新しい文章や画像を作るAI", "ロボット"],
                              "correctAnswer": "B", "explanation": "生成AIはコンテンツを作ります。"}},
                    {"type": "Collectible", "x": 300, "y": 450, "itemName": "光る石"},
                    {"type": "Portal", "x": 600, "y": 450, "targetScene": "Forest", "entryX": 50}
                ]
            },
            "Forest": {
                "entities": [
                    {"type": "NPC", "x": 100, "y": 450, "name": "村人B",
                     "quiz": {"question": "Which are true?", "options": ["a", "b", "c"],
                              "correctAnswer": ["A", "C"], "multiSelect": true, "explanation": "A and C"}}
                ]
            },
            "Castle": {
                "entities": [
                    {"type": "NPC", "x": 100, "y": 450, "name": "兵士",
                     "quiz": {"question": "Pick A", "options": ["A", "B"], "correctAnswer": "A", "explanation": "A"}},
                    {"type": "Portal", "x": 300, "y": 450, "targetScene": "ChapterSelectionScene", "confirm": true}
                ]
            },
            "Plaza": {
                "entities": [
                    {"type": "Collectible", "x": 250, "y": 450, "itemName": "far"},
                    {"type": "Collectible", "x": 180, "y": 450, "itemName": "middle"},
                    {"type": "Collectible", "x": 150, "y": 450, "itemName": "near"},
                    {"type": "NPC", "x": 900, "y": 450, "name": "silent"}
                ]
            }
        },
        "caseLists": {
            "Cases": {"title": "Cases", "cases": [{"title": "Case A", "scene": "CaseA"}]}
        },
        "caseScenes": {
            "CaseA": {"title": "Case A", "parts": [
                {"type": "scenario", "pages": [{"text": "A villager needs help"}]},
                {"type": "exercise", "description": "Type yes", "expectedAnswer": "yes"},
                {"type": "review", "prompts": [{"title": "Example", "text": "Be specific"}]}
            ]}
        },
        "chapters": {
            "chapter1": {
                "title": "Chapter 1", "scenes": ["Village", "Forest"], "totalQuizzes": 2,
                "endings": {"high": [{"text": "Well done"}], "low": [{"text": "Try again"}]}
            },
            "chapter2": {
                "title": "Chapter 2", "scenes": ["Castle"], "totalQuizzes": 1,
                "intro": [{"text": "The castle"}],
                "endings": {"high": [{"text": "Castle saved"}], "low": [{"text": "Castle lost"}]}
            }
        }
    }))
    .expect("fixture content");
    Rc::new(content)
}

fn press(action: InputAction) -> InputSnapshot {
    InputSnapshot::empty().with_action_pressed(action)
}

fn click(target: UiTarget) -> InputSnapshot {
    InputSnapshot::empty().with_pointer(PointerEvent::Click(target))
}

fn field_at(content: &Rc<GameContent>, key: &str, x: f32, state: &mut PersistentState) -> FieldScene {
    let mut scene =
        FieldScene::new(SceneKey::new(key), Rc::clone(content), Some(x)).expect("known scene");
    scene.load(state);
    scene
}

fn step<S: Scene<PersistentState, SceneEntry>>(
    scene: &mut S,
    state: &mut PersistentState,
    input: InputSnapshot,
) -> SceneCommand<SceneEntry> {
    scene.update(DT, &input, state)
}

fn idle<S: Scene<PersistentState, SceneEntry>>(
    scene: &mut S,
    state: &mut PersistentState,
    ticks: usize,
) {
    for _ in 0..ticks {
        step(scene, state, InputSnapshot::empty());
    }
}

#[test]
fn villager_conversation_quiz_and_replay_end_to_end() {
    let content = fixture();
    let mut state = PersistentState::new();
    let mut scene = field_at(&content, "Village", 100.0, &mut state);
    let quiz_id = QuizId::for_npc("Village", "村人A");

    idle(&mut scene, &mut state, 1);
    assert_eq!(scene.target().map(|entity| entity.kind()), Some(EntityKind::Npc));

    step(&mut scene, &mut state, press(InputAction::Interact));
    assert_eq!(scene.dialog_phase(), DialogPhase::Typing);
    assert_eq!(state.modal().open_kind(), Some(ModalKind::Dialog));

    step(&mut scene, &mut state, press(InputAction::Interact));
    assert_eq!(scene.dialog_phase(), DialogPhase::AwaitingAdvance);
    assert_eq!(scene.dialog_text(), "こんにちは");

    step(&mut scene, &mut state, press(InputAction::Interact));
    idle(&mut scene, &mut state, 60);
    assert_eq!(scene.dialog_text(), "AIについて教えて");
    assert_eq!(
        scene.dialog_phase(),
        DialogPhase::AwaitingAdvance,
        "quiz still follows"
    );

    step(&mut scene, &mut state, press(InputAction::Interact));
    assert!(scene.quiz().is_answering());
    assert_eq!(state.modal().open_kind(), Some(ModalKind::Quiz));
    assert_eq!(scene.dialog_phase(), DialogPhase::Idle);

    step(&mut scene, &mut state, press(InputAction::NavigateDown));
    step(&mut scene, &mut state, press(InputAction::NavigateDown));
    assert_eq!(scene.quiz().highlight(), Some(1));
    step(&mut scene, &mut state, press(InputAction::Interact));
    assert!(scene.quiz().is_showing_explanation());
    assert_eq!(state.user_answer(&quiz_id), Some(&['B'][..]));
    assert!(
        !state.is_quiz_completed(&quiz_id),
        "completion waits for the explanation to close"
    );

    step(&mut scene, &mut state, press(InputAction::Interact));
    assert!(state.is_quiz_completed(&quiz_id));
    assert_eq!(state.correct_answers(), 1);
    assert!(!state.modal().is_open());
    assert!(!scene.quiz().is_open());

    step(&mut scene, &mut state, press(InputAction::Interact));
    assert_eq!(scene.quiz().completed_page(), Some(CompletedPage::Question));
    assert_eq!(state.modal().open_kind(), Some(ModalKind::CompletedQuiz));
    step(&mut scene, &mut state, press(InputAction::Interact));
    assert_eq!(scene.quiz().completed_page(), Some(CompletedPage::Answer));
    step(&mut scene, &mut state, press(InputAction::Interact));
    assert!(!scene.quiz().is_open());
    assert!(!state.modal().is_open());
    assert_eq!(state.correct_answers(), 1, "replay never scores again");
}

#[test]
fn completed_view_renders_stored_answer_and_remark() {
    let content = fixture();
    let mut state = PersistentState::new();
    let quiz_id = QuizId::for_npc("Village", "村人A");
    state.record_answer(&quiz_id, &['C'].into_iter().collect());
    state.complete_quiz(&quiz_id, false);

    let mut scene = field_at(&content, "Village", 100.0, &mut state);
    idle(&mut scene, &mut state, 1);
    step(&mut scene, &mut state, press(InputAction::Interact));

    let mut frame = Frame::new();
    scene.render(&state, &mut frame);
    let lines = frame.panel_lines(super::quiz::QUIZ_PANEL).expect("quiz panel");
    assert_eq!(lines[0], "I already solved that quiz.");
    assert!(lines.iter().any(|line| line == "Your answer: C"));
    assert!(frame.panel_lines(super::dialog::DIALOG_PANEL).is_none());
}

#[test]
fn abandoning_quiz_with_cancel_leaves_it_open_for_later() {
    let content = fixture();
    let mut state = PersistentState::new();
    let mut scene = field_at(&content, "Forest", 100.0, &mut state);
    let quiz_id = QuizId::for_npc("Forest", "村人B");

    idle(&mut scene, &mut state, 1);
    step(&mut scene, &mut state, press(InputAction::Interact));
    assert!(scene.quiz().is_answering(), "no lines, straight to the quiz");
    step(&mut scene, &mut state, press(InputAction::Cancel));

    assert!(!scene.quiz().is_open());
    assert!(!state.modal().is_open());
    assert!(!state.is_quiz_completed(&quiz_id));
    assert_eq!(state.completed_count(), 0);

    step(&mut scene, &mut state, press(InputAction::Interact));
    assert!(scene.quiz().is_answering());
}

#[test]
fn multi_select_grades_by_set_equality() {
    let content = fixture();
    let mut state = PersistentState::new();
    let mut scene = field_at(&content, "Forest", 100.0, &mut state);
    let quiz_id = QuizId::for_npc("Forest", "村人B");

    idle(&mut scene, &mut state, 1);
    step(&mut scene, &mut state, press(InputAction::Interact));
    step(&mut scene, &mut state, click(UiTarget::ListItem(2)));
    step(&mut scene, &mut state, click(UiTarget::ListItem(0)));
    step(&mut scene, &mut state, click(UiTarget::Confirm));
    assert_eq!(state.user_answer(&quiz_id), Some(&['A', 'C'][..]));
    step(&mut scene, &mut state, click(UiTarget::Backdrop));

    assert!(state.is_quiz_completed(&quiz_id));
    assert_eq!(state.correct_answers(), 1);
}

#[test]
fn only_one_modal_is_open_at_a_time() {
    let content = fixture();
    let mut state = PersistentState::new();
    let mut scene = field_at(&content, "Village", 100.0, &mut state);
    idle(&mut scene, &mut state, 1);

    step(&mut scene, &mut state, press(InputAction::Help));
    assert!(scene.is_help_open());
    step(&mut scene, &mut state, press(InputAction::Interact));
    assert_eq!(scene.dialog_phase(), DialogPhase::Idle, "help swallows input");
    assert_eq!(state.modal().open_kind(), Some(ModalKind::Help));

    step(&mut scene, &mut state, press(InputAction::Cancel));
    assert!(!scene.is_help_open());
    assert!(!state.modal().is_open());

    step(&mut scene, &mut state, press(InputAction::Interact));
    assert_eq!(state.modal().open_kind(), Some(ModalKind::Dialog));
    step(&mut scene, &mut state, press(InputAction::Help));
    assert!(!scene.is_help_open(), "help refused while talking");
    assert_eq!(state.modal().open_kind(), Some(ModalKind::Dialog));
}

#[test]
fn player_does_not_move_while_a_modal_is_open() {
    let content = fixture();
    let mut state = PersistentState::new();
    let mut scene = field_at(&content, "Village", 100.0, &mut state);
    idle(&mut scene, &mut state, 1);
    step(&mut scene, &mut state, press(InputAction::Interact));

    let before = scene.player_position();
    for _ in 0..10 {
        step(
            &mut scene,
            &mut state,
            InputSnapshot::empty().with_action_down(InputAction::MoveRight, true),
        );
    }
    assert_eq!(scene.player_position(), before);

    step(&mut scene, &mut state, press(InputAction::Cancel));
    step(
        &mut scene,
        &mut state,
        InputSnapshot::empty().with_action_down(InputAction::MoveRight, true),
    );
    assert!(scene.player_position().x > before.x);
}

#[test]
fn targeting_picks_nearest_inside_radius_from_content() {
    let content = fixture();
    let mut state = PersistentState::new();
    let mut scene = field_at(&content, "Plaza", 100.0, &mut state);
    idle(&mut scene, &mut state, 1);

    let target = scene.target().expect("something in range");
    let EntityBody::Collectible(item) = &target.body else {
        panic!("expected collectible");
    };
    assert_eq!(item.item_name, "near");
    let title = scene.debug_title(&state).expect("field scenes report a title");
    assert!(title.contains("target=Collectible"), "{title}");

    let mut frame = Frame::new();
    scene.render(&state, &mut frame);
    let prompts: Vec<_> = frame.world_labels().collect();
    assert_eq!(
        prompts,
        vec![(sage_engine::Vec2::new(150.0, 370.0), "E/Enter: pick up")]
    );
}

#[test]
fn npc_without_dialog_or_quiz_closes_gracefully() {
    let content = fixture();
    let mut state = PersistentState::new();
    let mut scene = field_at(&content, "Plaza", 900.0, &mut state);
    idle(&mut scene, &mut state, 1);
    assert_eq!(scene.target().map(|entity| entity.kind()), Some(EntityKind::Npc));

    step(&mut scene, &mut state, press(InputAction::Interact));
    assert_eq!(scene.dialog_phase(), DialogPhase::Idle);
    assert!(!state.modal().is_open());
}

#[test]
fn collectible_is_recorded_once_and_not_rebuilt() {
    let content = fixture();
    let mut state = PersistentState::new();
    let mut scene = field_at(&content, "Village", 300.0, &mut state);
    idle(&mut scene, &mut state, 1);
    assert_eq!(
        scene.target().map(|entity| entity.kind()),
        Some(EntityKind::Collectible)
    );

    step(&mut scene, &mut state, press(InputAction::Interact));
    assert!(state.is_item_collected("Village-光る石-300-450"));
    assert_eq!(scene.toast_texts().collect::<Vec<_>>(), vec!["Got 光る石!"]);
    assert!(scene.target().is_none());
    idle(&mut scene, &mut state, 130);
    assert_eq!(scene.toast_texts().count(), 0, "toast expires after 2s");

    let rebuilt = field_at(&content, "Village", 300.0, &mut state);
    assert!(rebuilt
        .entities()
        .iter()
        .all(|entity| entity.kind() != EntityKind::Collectible));
}

#[test]
fn portal_fades_then_switches_with_entry_x() {
    let content = fixture();
    let mut state = PersistentState::new();
    let mut scene = field_at(&content, "Village", 590.0, &mut state);
    idle(&mut scene, &mut state, 1);
    assert_eq!(
        scene.target().map(|entity| entity.kind()),
        Some(EntityKind::Portal)
    );

    step(&mut scene, &mut state, press(InputAction::Interact));
    assert!(scene.is_transitioning());

    let mut switched = None;
    for tick in 1..=40 {
        if let SceneCommand::SwitchTo { key, entry } =
            step(&mut scene, &mut state, press(InputAction::Interact))
        {
            switched = Some((tick, key, entry));
            break;
        }
    }
    let (tick, key, entry) = switched.expect("transition completes");
    assert!(tick >= 29, "fade lasts half a second, finished at tick {tick}");
    assert_eq!(key.as_str(), "Forest");
    assert_eq!(entry, SceneEntry::Field { entry_x: Some(50.0) });
}

#[test]
fn confirm_portal_asks_first() {
    let content = fixture();
    let mut state = PersistentState::new();
    let mut scene = field_at(&content, "Castle", 300.0, &mut state);
    idle(&mut scene, &mut state, 1);

    step(&mut scene, &mut state, press(InputAction::Interact));
    assert!(scene.is_confirm_open());
    assert_eq!(state.modal().open_kind(), Some(ModalKind::Confirm));
    step(&mut scene, &mut state, press(InputAction::Cancel));
    assert!(!scene.is_confirm_open());
    assert!(!scene.is_transitioning());

    step(&mut scene, &mut state, press(InputAction::Interact));
    step(&mut scene, &mut state, click(UiTarget::Confirm));
    assert!(scene.is_transitioning());
    assert!(!state.modal().is_open());

    let command = (0..40)
        .map(|_| step(&mut scene, &mut state, InputSnapshot::empty()))
        .find(|command| !matches!(command, SceneCommand::None))
        .expect("switch");
    assert_eq!(
        command,
        SceneCommand::SwitchTo {
            key: SceneKey::new(CHAPTER_SELECTION_SCENE),
            entry: SceneEntry::Menu,
        }
    );
}

#[test]
fn back_button_returns_to_chapter_selection() {
    let content = fixture();
    let mut state = PersistentState::new();
    let mut scene = field_at(&content, "Castle", 200.0, &mut state);
    let command = step(&mut scene, &mut state, click(UiTarget::Close));
    assert_eq!(
        command,
        SceneCommand::SwitchTo {
            key: SceneKey::new(CHAPTER_SELECTION_SCENE),
            entry: SceneEntry::Menu,
        }
    );
}

fn answer_castle_quiz(
    chapter: &mut ChapterProgressController,
    state: &mut PersistentState,
    row: usize,
) -> SceneCommand<SceneEntry> {
    step(chapter, state, InputSnapshot::empty());
    step(chapter, state, press(InputAction::Interact));
    step(chapter, state, click(UiTarget::ListItem(row)));
    step(chapter, state, press(InputAction::Interact))
}

fn castle_chapter(content: &Rc<GameContent>, state: &mut PersistentState) -> ChapterProgressController {
    let field =
        FieldScene::new(SceneKey::new("Castle"), Rc::clone(content), Some(100.0)).expect("known scene");
    let Ok(mut chapter) = ChapterProgressController::wrap(field, content) else {
        panic!("Castle belongs to chapter2");
    };
    chapter.load(state);
    chapter
}

#[test]
fn chapter_clear_fires_once_with_high_ending() {
    let content = fixture();
    let mut state = PersistentState::new();
    let mut chapter = castle_chapter(&content, &mut state);

    let command = answer_castle_quiz(&mut chapter, &mut state, 0);
    assert!(chapter.is_cleared());
    assert_eq!(
        command,
        SceneCommand::SwitchTo {
            key: SceneKey::new(STORY_SCENE),
            entry: SceneEntry::Story(StoryRequest {
                pages: vec![StoryPage {
                    text: "Castle saved".to_string(),
                    image: None,
                }],
                then: StoryNext::Result(ChapterResult {
                    chapter_key: "chapter2".to_string(),
                    accuracy: 1.0,
                    correct: 1,
                    total: 1,
                }),
            }),
        }
    );

    for _ in 0..5 {
        assert_eq!(
            step(&mut chapter, &mut state, InputSnapshot::empty()),
            SceneCommand::None
        );
    }
}

#[test]
fn wrong_answer_takes_low_ending() {
    let content = fixture();
    let mut state = PersistentState::new();
    let mut chapter = castle_chapter(&content, &mut state);

    let SceneCommand::SwitchTo {
        entry: SceneEntry::Story(request),
        ..
    } = answer_castle_quiz(&mut chapter, &mut state, 1)
    else {
        panic!("expected the ending story");
    };
    assert_eq!(request.pages[0].text, "Castle lost");
    let StoryNext::Result(result) = request.then else {
        panic!("ending leads to the result screen");
    };
    assert_eq!(result.accuracy, 0.0);
}

#[test]
fn chapter_score_ignores_answers_from_earlier_chapters() {
    let content = fixture();
    let mut state = PersistentState::new();
    state.complete_quiz(&QuizId::for_npc("Village", "村人A"), true);

    let forest = field_at(&content, "Forest", 100.0, &mut state);
    let Ok(mut forest) = ChapterProgressController::wrap(forest, &content) else {
        panic!("Forest belongs to chapter1");
    };
    step(&mut forest, &mut state, InputSnapshot::empty());
    step(&mut forest, &mut state, press(InputAction::Interact));
    step(&mut forest, &mut state, click(UiTarget::ListItem(0)));
    step(&mut forest, &mut state, click(UiTarget::ListItem(2)));
    step(&mut forest, &mut state, click(UiTarget::Confirm));
    let SceneCommand::SwitchTo {
        entry: SceneEntry::Story(first),
        ..
    } = step(&mut forest, &mut state, click(UiTarget::Backdrop))
    else {
        panic!("chapter1 should end once both quizzes are done");
    };
    assert_eq!(first.pages[0].text, "Well done");
    assert_eq!(state.correct_answers(), 2);

    let mut castle = castle_chapter(&content, &mut state);
    let SceneCommand::SwitchTo {
        entry: SceneEntry::Story(second),
        ..
    } = answer_castle_quiz(&mut castle, &mut state, 1)
    else {
        panic!("expected the castle ending");
    };
    assert_eq!(second.pages[0].text, "Castle lost");
    assert_eq!(
        second.then,
        StoryNext::Result(ChapterResult {
            chapter_key: "chapter2".to_string(),
            accuracy: 0.0,
            correct: 0,
            total: 1,
        })
    );
}

#[test]
fn returning_to_a_cleared_chapter_does_not_replay_the_ending() {
    let content = fixture();
    let mut state = PersistentState::new();
    let castle = QuizId::for_npc("Castle", "兵士");
    state.complete_quiz(&castle, true);

    let mut chapter = castle_chapter(&content, &mut state);
    assert!(chapter.is_cleared());
    for _ in 0..5 {
        assert_eq!(
            step(&mut chapter, &mut state, InputSnapshot::empty()),
            SceneCommand::None
        );
    }

    assert_eq!(
        step(&mut chapter, &mut state, press(InputAction::Interact)),
        SceneCommand::None
    );
    assert_eq!(
        chapter.field().quiz().completed_page(),
        Some(CompletedPage::Question)
    );
}

#[test]
fn non_chapter_scene_is_not_wrapped() {
    let content = fixture();
    let mut state = PersistentState::new();
    let field = field_at(&content, "Plaza", 100.0, &mut state);
    assert!(ChapterProgressController::wrap(field, &content).is_err());
}

#[test]
fn quest_tracker_counts_chapter_quizzes() {
    let content = fixture();
    let mut state = PersistentState::new();
    state.complete_quiz(&QuizId::for_npc("Forest", "村人B"), true);
    state.complete_quiz(&QuizId::for_npc("Castle", "兵士"), true);

    let scene = field_at(&content, "Village", 100.0, &mut state);
    let mut frame = Frame::new();
    scene.render(&state, &mut frame);
    assert_eq!(
        frame.screen_label(sage_engine::ScreenAnchor::TopLeft),
        Some("Teach the villagers about AI (1/2)")
    );

    state.set_total_quizzes(5);
    let plaza = field_at(&content, "Plaza", 100.0, &mut state);
    assert_eq!(plaza.quest_progress(&state), (2, 5));
}

#[test]
fn retry_resets_only_the_retried_chapter() {
    let content = fixture();
    let mut state = PersistentState::new();
    let village = QuizId::for_npc("Village", "村人A");
    let forest = QuizId::for_npc("Forest", "村人B");
    let castle = QuizId::for_npc("Castle", "兵士");
    state.complete_quiz(&village, true);
    state.complete_quiz(&forest, true);
    state.complete_quiz(&castle, true);

    let command = retry_chapter(&content, "chapter2", &mut state);
    assert_eq!(
        command,
        SceneCommand::SwitchTo {
            key: SceneKey::new("Castle"),
            entry: SceneEntry::Field { entry_x: None },
        }
    );
    assert!(!state.is_quiz_completed(&castle));
    assert!(state.is_quiz_completed(&village));
    assert!(state.is_quiz_completed(&forest));
    assert_eq!(state.correct_answers(), 0);
    assert_eq!(state.total_quizzes(), 1);
}

#[test]
fn initial_route_plays_intro_before_start_scene() {
    let content = fixture();
    let (key, entry) = initial_route(&content, &SceneKey::new(CHAPTER_SELECTION_SCENE));
    assert_eq!(key.as_str(), STORY_SCENE);
    let SceneEntry::Story(request) = entry else {
        panic!("intro story expected");
    };
    assert_eq!(request.pages.len(), 2);

    let (key, entry) = initial_route(&content, &SceneKey::new("Castle"));
    assert_eq!(key.as_str(), "Castle");
    assert_eq!(entry, SceneEntry::Field { entry_x: None });
}

#[test]
fn provider_rejects_unknown_scene_keys() {
    let content = fixture();
    let mut machine = SceneMachine::new(
        Box::new(GameSceneProvider::new(Rc::clone(&content))),
        PersistentState::new(),
    );
    assert!(machine
        .switch_to(SceneKey::new("Nowhere"), SceneEntry::Field { entry_x: None })
        .is_err());
    machine
        .switch_to(SceneKey::new("Village"), SceneEntry::Field { entry_x: None })
        .expect("known scene");
    assert_eq!(machine.active_scene().map(SceneKey::as_str), Some("Village"));
}

fn follow(
    machine: &mut SceneMachine<PersistentState, SceneEntry>,
    input: InputSnapshot,
) -> Option<SceneKey> {
    match machine.update_active(DT, &input).expect("active scene") {
        SceneCommand::SwitchTo { key, entry } => {
            machine.switch_to(key.clone(), entry).expect("known scene");
            Some(key)
        }
        SceneCommand::None | SceneCommand::Quit => None,
    }
}

#[test]
fn case_runs_from_list_through_every_part_and_back() {
    let content = fixture();
    let mut machine = SceneMachine::new(
        Box::new(GameSceneProvider::new(Rc::clone(&content))),
        PersistentState::new(),
    );
    machine
        .switch_to(SceneKey::new("Cases"), SceneEntry::Menu)
        .expect("case list");

    let case = Some(SceneKey::new("CaseA"));
    assert_eq!(follow(&mut machine, press(InputAction::Interact)), case);
    assert_eq!(
        follow(&mut machine, InputSnapshot::empty()),
        Some(SceneKey::new(STORY_SCENE))
    );
    assert_eq!(follow(&mut machine, press(InputAction::Interact)), case);
    assert!(machine
        .debug_title_active()
        .is_some_and(|title| title.contains("part 2/3 exercise")));

    assert_eq!(follow(&mut machine, InputSnapshot::empty().with_text("no")), None);
    assert_eq!(follow(&mut machine, press(InputAction::Interact)), None);
    assert_eq!(follow(&mut machine, InputSnapshot::empty().with_text("yes")), None);
    assert_eq!(follow(&mut machine, press(InputAction::Interact)), case);

    assert_eq!(follow(&mut machine, press(InputAction::Interact)), None);
    assert!(machine.context().is_case_completed("CaseA"));
    let mut landed = None;
    for _ in 0..40 {
        landed = follow(&mut machine, InputSnapshot::empty());
        if landed.is_some() {
            break;
        }
    }
    assert_eq!(landed, Some(SceneKey::new("Cases")));
}

#[test]
fn scripted_run_through_menu_into_chapter_and_back() {
    let content = fixture();
    let script = parse_script(
        "# skip the intro\n\
         press cancel\n\
         wait 1\n\
         # chapter 2 has an intro page\n\
         press down\n\
         press interact\n\
         press interact\n\
         wait 1\n\
         press interact\n\
         click item 0\n\
         press interact\n\
         # ending story then result\n\
         press interact\n\
         wait 1\n\
         click item 1\n\
         wait 1\n",
    )
    .expect("script parses");
    let mut input = ScriptedInput::from_steps(&script);
    let mut machine = SceneMachine::new(
        Box::new(GameSceneProvider::new(Rc::clone(&content))),
        PersistentState::new(),
    );
    let mut renderer = TraceRenderer::default();
    let (start, entry) = initial_route(&content, &SceneKey::new(CHAPTER_SELECTION_SCENE));

    let summary = run_app(
        &LoopConfig::default(),
        &mut machine,
        start,
        entry,
        &mut input,
        &mut renderer,
    )
    .expect("run succeeds");

    assert_eq!(summary.stop_reason, StopReason::InputExhausted);
    assert_eq!(
        summary.final_scene.as_ref().map(SceneKey::as_str),
        Some(CHAPTER_SELECTION_SCENE)
    );
    let state = machine.context();
    assert!(state.is_quiz_completed(&QuizId::for_npc("Castle", "兵士")));
    assert_eq!(state.correct_answers(), 1);
    assert_eq!(state.total_quizzes(), 1);
}
