//! End-to-end pick scenarios against the CPU reference backend.

use chromapick_core::*;

const WIDTH: u32 = 1200;
const HEIGHT: u32 = 800;

/// Unit square in the XY plane, as two triangles.
fn unit_quad() -> Vec<Vec3> {
    vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
    ]
}

/// Placement of one object: framebuffer-space rectangle and distance from camera.
#[derive(Clone, Copy)]
struct Placement {
    x: f32,
    y: f32,
    size: f32,
    distance: f32,
}

/// World space equals framebuffer space; depth grows with distance.
fn camera() -> Mat4 {
    Mat4::orthographic_rh(0.0, WIDTH as f32, 0.0, HEIGHT as f32, 0.0, 10.0)
}

fn model(p: Placement) -> Mat4 {
    Mat4::from_translation(Vec3::new(p.x, p.y, -p.distance))
        * Mat4::from_scale(Vec3::new(p.size, p.size, 1.0))
}

/// Ten objects along the bottom of the framebuffer, none near the top-left.
fn layout() -> Vec<Placement> {
    (0..10)
        .map(|i| Placement {
            x: 20.0 + 110.0 * i as f32,
            y: 20.0,
            size: 100.0,
            distance: 5.0,
        })
        .collect()
}

struct Fixture {
    target: SoftwareTarget,
    resolver: PickResolver,
    transforms: TransformCache,
}

impl Fixture {
    fn new(placements: &[Placement]) -> Self {
        let mut target = SoftwareTarget::new(WIDTH, HEIGHT);
        target.set_vertices(unit_quad());
        let count = u32::try_from(placements.len()).unwrap();
        let resolver = PickResolver::new(
            PickOptions::with_object_count(count),
            DrawSpec::new(PrimitiveKind::Triangles, 0, 6),
        )
        .unwrap();
        let mut transforms = TransformCache::new();
        transforms.update(camera(), count, |h| model(placements[h.index()]));
        Self {
            target,
            resolver,
            transforms,
        }
    }

    fn pick(&mut self, x: i64, y: i64) -> Option<ObjectHandle> {
        self.resolver
            .resolve_pick(&mut self.target, PickRequest::new(x, y), &self.transforms)
            .unwrap()
    }

    /// Draws the "visible" pass with per-object display colours and returns
    /// the display colour at window position `(x, y)`.
    fn visible_color_at(&mut self, x: u32, y: u32, palette: &[IdentityColor]) -> IdentityColor {
        let t = &mut self.target;
        t.clear(IdentityColor::new(0, 0, 0, 255), CLEAR_DEPTH).unwrap();
        t.bind_flat_color_shader().unwrap();
        for i in 0..self.resolver.object_count() {
            let h = ObjectHandle(i);
            t.set_transform(self.transforms.get(h).unwrap()).unwrap();
            t.set_color(palette[h.index()]).unwrap();
            t.draw(DrawSpec::new(PrimitiveKind::Triangles, 0, 6)).unwrap();
        }
        t.finish().unwrap();
        t.read_pixel(x, HEIGHT - 1 - y).unwrap()
    }
}

#[test]
fn scenario_a_frontmost_object_is_selected() {
    let mut placements = layout();
    // Object 3 in front of object 7, both covering window pixel (100, 100).
    placements[3] = Placement {
        x: 50.0,
        y: 650.0,
        size: 100.0,
        distance: 1.0,
    };
    placements[7] = Placement {
        x: 20.0,
        y: 620.0,
        size: 150.0,
        distance: 4.0,
    };

    let mut fixture = Fixture::new(&placements);
    assert_eq!(fixture.pick(100, 100), Some(ObjectHandle(3)));
    assert_eq!(fixture.resolver.selection().as_sentinel(), 3);
}

#[test]
fn scenario_b_background_pixel_selects_nothing() {
    let mut fixture = Fixture::new(&layout());
    assert_eq!(fixture.pick(600, 10), None);
    assert_eq!(fixture.resolver.selection().as_sentinel(), NO_SELECTION);
}

#[test]
fn scenario_c_selection_is_overwritten() {
    let mut fixture = Fixture::new(&layout());
    // Object 5 spans x 570..670 and window rows 680..780.
    assert_eq!(fixture.pick(620, 730), Some(ObjectHandle(5)));
    assert!(fixture.resolver.selection().is_selected(ObjectHandle(5)));

    assert_eq!(fixture.pick(620, 300), None);
    assert_eq!(fixture.resolver.selected(), None);
}

#[test]
fn every_object_is_pickable() {
    let mut fixture = Fixture::new(&layout());
    for i in 0..10 {
        let x = 70 + 110 * i64::from(i);
        assert_eq!(fixture.pick(x, 730), Some(ObjectHandle(i)));
    }
}

#[test]
fn occlusion_matches_visible_pass() {
    let palette: Vec<IdentityColor> = (0..2)
        .map(|i| IdentityColor::new(200, 40 * (i + 1), 10, 255))
        .collect();

    for (near, far) in [(0usize, 1usize), (1, 0)] {
        let mut placements = vec![
            Placement {
                x: 400.0,
                y: 300.0,
                size: 200.0,
                distance: 0.0,
            };
            2
        ];
        placements[near].distance = 2.0;
        placements[far].distance = 6.0;
        placements[far].x = 450.0;

        let mut fixture = Fixture::new(&placements);
        let visible = fixture.visible_color_at(500, 400, &palette);
        let picked = fixture.pick(500, 400).unwrap();

        assert_eq!(picked.index(), near);
        assert_eq!(visible, palette[picked.index()]);
    }
}

#[test]
fn out_of_bounds_pick_is_rejected_or_clamped() {
    let mut fixture = Fixture::new(&layout());
    fixture.pick(70, 730);
    assert_eq!(fixture.pick(-10, 730), None);
    assert_eq!(fixture.pick(70, 800), None);

    let mut clamping = Fixture::new(&layout());
    clamping.resolver = PickResolver::new(
        PickOptions {
            out_of_bounds: OutOfBoundsPolicy::Clamp,
            ..PickOptions::default()
        },
        DrawSpec::new(PrimitiveKind::Triangles, 0, 6),
    )
    .unwrap();
    // Clamped to framebuffer row 0, below every object.
    assert_eq!(clamping.pick(70, 10_000), None);
    // Clamped to column 0, left of every object.
    assert_eq!(clamping.pick(-50, 730), None);
    assert_eq!(clamping.pick(70, 730), Some(ObjectHandle(0)));
}

#[test]
fn identity_pass_leaves_no_blended_colours() {
    let mut fixture = Fixture::new(&layout());
    fixture
        .resolver
        .render_identity_pass(&mut fixture.target, &fixture.transforms)
        .unwrap();
    for &pixel in fixture.target.pixels() {
        assert!(
            pixel == BACKGROUND_COLOR || decode(pixel, 10).is_some(),
            "unexpected colour {pixel:?} in identity pass"
        );
    }
}

#[test]
fn overflowing_draw_range_fails_without_changing_selection() {
    let mut fixture = Fixture::new(&layout());
    assert_eq!(fixture.pick(620, 730), Some(ObjectHandle(5)));

    fixture
        .resolver
        .set_draw(ObjectHandle(0), DrawSpec::new(PrimitiveKind::Triangles, u32::MAX, 2))
        .unwrap();
    let result = fixture.resolver.resolve_pick(
        &mut fixture.target,
        PickRequest::new(1, 1),
        &fixture.transforms,
    );
    assert!(matches!(result, Err(PickError::Render(_))));
    assert_eq!(fixture.resolver.selected(), Some(ObjectHandle(5)));
}
