//! Picking demo.
//!
//! Renders the spiral ring offscreen, picks a few cursor positions and saves
//! the visible frame and the identity buffer next to the working directory.
//!
//! Run with `RUST_LOG=debug cargo run --example pick_demo` to see every
//! sampled pixel.

use chromapick::*;

fn main() -> Result<()> {
    init_logging();

    let mut viewer = Viewer::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)?;

    let cursors = [(600.0, 400.0), (760.5, 300.25), (5.0, 5.0), (-20.0, 100.0)];
    for (x, y) in cursors {
        match viewer.pick_cursor(x, y)? {
            Some(handle) => println!("cursor ({x}, {y}) -> spiral {handle}"),
            None => println!("cursor ({x}, {y}) -> nothing"),
        }
    }

    // Pick the first spiral through its projected centre so a selection shows.
    let center = viewer.scene().model(ObjectHandle(0)).transform_point3(Vec3::ZERO);
    let clip = viewer.camera().view_projection_matrix() * center.extend(1.0);
    let ndc = clip.truncate() / clip.w;
    let (width, height) = viewer.size();
    let x = f64::from((ndc.x + 1.0) * 0.5) * f64::from(width);
    let y = f64::from((1.0 - ndc.y) * 0.5) * f64::from(height);
    println!(
        "centre of spiral 0 at ({x:.1}, {y:.1}) -> {:?}",
        viewer.pick_cursor(x, y)?
    );

    viewer.save_frame("pick_demo_frame.png")?;
    viewer.save_pick_buffer("pick_demo_ids.png")?;
    println!("saved pick_demo_frame.png and pick_demo_ids.png");

    Ok(())
}
