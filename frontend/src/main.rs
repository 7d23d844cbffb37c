//! Minimal SDL2 host for the Khepra core. Grounded on the teacher's
//! `frontend/src/main.rs` shape (parse args, build a machine, hand it to
//! an event/render loop) with the multi-game switch and MAME ROM-set
//! loading removed — Khepra is one console with one `"KHPR"` image format,
//! loaded straight through `khepra_system::load_machine`.

mod input;
mod video;

use std::path::PathBuf;

use clap::Parser;
use khepra_system::KhepraSystem;
use sdl2::event::Event;
use sdl2::keyboard::Scancode;

use input::KeyMap;
use video::Video;

/// One master cycle per scanline dot, 341 dots per scanline, 262 scanlines
/// per frame (`spec.md` §4.4).
const CORE_CYCLES_PER_FRAME: u64 = 341 * 262;

#[derive(Parser)]
#[command(name = "khepra", about = "Khepra console emulator")]
struct Args {
    /// Path to a "KHPR" ROM image.
    rom: PathBuf,

    /// Path to a 768-byte (256 RGB triples) palette file.
    #[arg(long)]
    palette: Option<PathBuf>,

    /// Window scale factor applied to the native 256x224 framebuffer.
    #[arg(long, default_value_t = 3)]
    scale: u32,
}

fn main() {
    let args = Args::parse();

    let mut system = khepra_system::load_machine(&args.rom, args.palette.as_deref())
        .unwrap_or_else(|e| panic!("failed to load ROM: {e}"));

    let sdl_context = sdl2::init().expect("Failed to initialize SDL2");
    let sdl_video = sdl_context.video().expect("Failed to init SDL video");
    let mut video = Video::new(&sdl_video, "Khepra", 256, 224, args.scale);
    let mut event_pump = sdl_context.event_pump().expect("Failed to get event pump");

    let key_map = input::default_key_map();
    let mut pad_state = [0u16; 2];

    'main: loop {
        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. } => break 'main,
                Event::KeyDown {
                    scancode: Some(Scancode::Escape),
                    ..
                } => break 'main,
                Event::KeyDown {
                    scancode: Some(Scancode::F1),
                    repeat: false,
                    ..
                } => system.request_user_interrupt(),
                Event::KeyDown {
                    scancode: Some(sc),
                    repeat: false,
                    ..
                } => set_pad_bit(&key_map, &mut pad_state, &mut system, sc, true),
                Event::KeyUp {
                    scancode: Some(sc), ..
                } => set_pad_bit(&key_map, &mut pad_state, &mut system, sc, false),
                _ => {}
            }
        }

        for _ in 0..CORE_CYCLES_PER_FRAME {
            system.step_cycle();
        }

        let framebuffer = system.framebuffer();
        video.present(&framebuffer);
        drop(framebuffer);
    }
}

fn set_pad_bit(key_map: &KeyMap, pad_state: &mut [u16; 2], system: &mut KhepraSystem, sc: Scancode, down: bool) {
    if let Some((pad, bit)) = key_map.get(sc) {
        if down {
            pad_state[pad as usize] |= bit;
        } else {
            pad_state[pad as usize] &= !bit;
        }
        system.set_input(pad, pad_state[pad as usize]);
    }
}
