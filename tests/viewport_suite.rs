use kurbo::{Point, Size, Vec2};
use structure_rs_renderer::config::{Config, ViewportConfig};
use structure_rs_renderer::parse_diagram;
use structure_rs_renderer::shell::{HostShell, Key, PrerenderedSvg, ShellError};
use structure_rs_renderer::viewport::{
    EventResponse, GestureState, Modifiers, PointerButton, ScrollViewport, ViewportEvent,
};

const DOC: &str = r#"{ "blocks": [
  { "id": "A", "title": "A", "rows": [{ "name": "to_b", "linkTo": "B" }] },
  { "id": "B", "title": "B", "rows": [{ "name": "to_c", "linkTo": "C" }] },
  { "id": "C", "title": "C", "rows": [{ "name": "leaf" }] }
] }"#;

fn shell_with_diagram() -> HostShell {
    let mut config = Config::default();
    config.layout.fast_text_metrics = true;
    let mut shell = HostShell::new(Size::new(600.0, 400.0), ViewportConfig::default());
    shell.add_surface("diagram", Point::new(0.0, 120.0));
    let graph = parse_diagram(DOC).unwrap().graph;
    shell.render_structure("diagram", graph, &config).unwrap();
    shell
}

fn content_under(shell: &HostShell, point: Point) -> Vec2 {
    let session = shell.overlay().session().unwrap();
    let controller = session.controller();
    let area = controller.viewport();
    (point - area.client_origin() + area.scroll_offset()) / controller.scale()
}

#[test]
fn zoom_session_lifecycle() {
    let mut shell = shell_with_diagram();
    assert!(shell.zoom("diagram").unwrap());
    assert_eq!(shell.overlay().session().unwrap().scale(), 1.5);

    let anchor = Point::new(200.0, 150.0);
    let overlay = shell.overlay_mut();
    for _ in 0..5 {
        assert_eq!(
            overlay.dispatch(&ViewportEvent::Wheel {
                position: anchor,
                delta_y: -40.0,
            }),
            EventResponse::Handled
        );
    }
    let scale = shell.overlay().session().unwrap().scale();
    assert!((scale - 1.65).abs() < 1e-9);

    assert!(shell.overlay_mut().handle_key(Key::Escape));
    assert!(!shell.overlay().is_open());
    assert_eq!(
        shell.overlay_mut().dispatch(&ViewportEvent::PointerUp),
        EventResponse::Ignored
    );
}

#[test]
fn wheel_zoom_keeps_anchor_in_overlay() {
    let mut shell = shell_with_diagram();
    shell.zoom("diagram").unwrap();
    let anchor = Point::new(150.0, 0.0);
    let before = content_under(&shell, anchor);
    shell.overlay_mut().dispatch(&ViewportEvent::Wheel {
        position: anchor,
        delta_y: -1.0,
    });
    let after = content_under(&shell, anchor);
    assert!((after - before).hypot() < 1e-9);
}

#[test]
fn drag_then_pinch_share_one_state_machine() {
    let mut shell = shell_with_diagram();
    shell.zoom("diagram").unwrap();
    let overlay = shell.overlay_mut();
    overlay.dispatch(&ViewportEvent::PointerDown {
        position: Point::new(100.0, 100.0),
        button: PointerButton::Primary,
        modifiers: Modifiers::none(),
    });
    assert!(matches!(
        overlay.session().unwrap().controller().state(),
        GestureState::Dragging { .. }
    ));
    overlay.dispatch(&ViewportEvent::PointerLeave);
    overlay.dispatch(&ViewportEvent::TouchStart {
        touches: vec![Point::new(100.0, 100.0), Point::new(200.0, 100.0)],
    });
    overlay.dispatch(&ViewportEvent::TouchMove {
        touches: vec![Point::new(50.0, 100.0), Point::new(250.0, 100.0)],
    });
    assert!((overlay.session().unwrap().scale() - 3.0).abs() < 1e-9);
    overlay.dispatch(&ViewportEvent::TouchMove {
        touches: vec![Point::new(-500.0, 100.0), Point::new(800.0, 100.0)],
    });
    assert_eq!(overlay.session().unwrap().scale(), 5.0);
    overlay.dispatch(&ViewportEvent::TouchEnd { touches: vec![] });
    assert_eq!(
        overlay.session().unwrap().controller().state(),
        GestureState::Idle
    );
}

#[test]
fn resize_listeners_do_not_accumulate_across_activations() {
    let mut shell = shell_with_diagram();
    for _ in 0..5 {
        shell.zoom("diagram").unwrap();
        shell.overlay_mut().click_backdrop();
    }
    shell.zoom("diagram").unwrap();
    assert_eq!(shell.hub().len(), 2);
    assert_eq!(shell.resize(Size::new(900.0, 400.0)), 2);
}

#[test]
fn failed_rerender_leaves_no_session() {
    let mut shell = shell_with_diagram();
    let source = PrerenderedSvg {
        svg: String::new(),
        size: Size::new(100.0, 100.0),
    };
    let err = shell.overlay_mut().open_rerender(&source).unwrap_err();
    assert!(matches!(err, ShellError::EmptyRender));
    assert!(!shell.overlay().is_open());

    let source = PrerenderedSvg {
        svg: "<svg xmlns=\"http://www.w3.org/2000/svg\"/>".to_string(),
        size: Size::new(300.0, 200.0),
    };
    shell.overlay_mut().open_rerender(&source).unwrap();
    let zoomed = shell.overlay().session().unwrap().zoomed_svg();
    assert!(zoomed.contains("width=\"450.00\""));
}

#[test]
fn host_resize_reaches_the_open_session() {
    let mut shell = shell_with_diagram();
    shell.zoom("diagram").unwrap();
    shell.resize(Size::new(1200.0, 900.0));

    let session = shell.overlay().session().unwrap();
    let area = session.controller().viewport();
    assert_eq!(area.client_size(), Size::new(1200.0, 900.0));
    assert!(area.extent.width >= 1200.0 && area.extent.height >= 900.0);

    let anchor = Point::ZERO;
    let before = content_under(&shell, anchor);
    shell.overlay_mut().dispatch(&ViewportEvent::Wheel {
        position: anchor,
        delta_y: -1.0,
    });
    let after = content_under(&shell, anchor);
    assert!((after - before).hypot() < 1e-9);
    assert!((shell.overlay().session().unwrap().scale() - 1.53).abs() < 1e-9);
}
