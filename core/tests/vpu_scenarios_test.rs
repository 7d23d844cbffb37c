//! VPU scanline-rendering scenarios. Registers are poked through the same
//! CPU-facing window (`Vpu::cpu_write`) a real game would use, during the
//! same VBlank a real game would have to wait for — nothing here reaches
//! past `Vpu`'s public surface to fake state the hardware wouldn't let you
//! reach from outside.

use khepra_core::cart;
use khepra_core::hrc::Hrc;
use khepra_core::mmu::Mmu;
use khepra_core::vpu::{Rgba, Vpu};

fn blank_cart() -> cart::Cart {
    let mut bytes = vec![0u8; cart::HEADER_LEN];
    bytes[0..4].copy_from_slice(b"KHPR");
    let total = bytes.len() as u32;
    bytes[4..8].copy_from_slice(&total.to_le_bytes());
    cart::load_rom(&bytes).unwrap()
}

/// Run cycles until the VPU's first VBlank request fires, leaving
/// `vpu.cpu_write` live for setup. Returns the cycle count reached.
fn run_to_first_vblank(mmu: &mut Mmu, vpu: &mut Vpu, hrc: &mut Hrc) -> u64 {
    let mut total: u64 = 0;
    loop {
        mmu.update(vpu, hrc);
        let fired = vpu.step(mmu, total);
        total += 1;
        if fired.is_some() {
            return total;
        }
    }
}

fn run_cycles(mmu: &mut Mmu, vpu: &mut Vpu, hrc: &mut Hrc, start: u64, count: u64) {
    let mut total = start;
    for _ in 0..count {
        mmu.update(vpu, hrc);
        vpu.step(mmu, total);
        total += 1;
    }
}

#[test]
fn tile_render_places_the_palette_color_at_its_screen_pixel() {
    let mut cart = blank_cart();
    // Tile #1's first row, byte 1 (tile-bank offset 0xC001): high nibble is
    // the palette index used by pixel (0, 0) of that tile.
    cart.tile_swap[0][0x01] = 0x10;

    let mut mmu = Mmu::new(&cart);
    let mut vpu = Vpu::new();
    let mut hrc = Hrc::new();

    let mut palette = vec![0u8; 256 * 3];
    palette[5 * 3] = 255;
    palette[5 * 3 + 1] = 0;
    palette[5 * 3 + 2] = 0;
    vpu.load_palette(&palette);

    let total = run_to_first_vblank(&mut mmu, &mut vpu, &mut hrc);

    vpu.cpu_write(0x480, 1); // layer-2 tilemap[0] = tile #1
    vpu.cpu_write(0x901, 5); // layer-2 palette (bank 0) index 1 -> pal_fixed[5]

    // Run past VBlank's end and through the first visible scanline.
    run_cycles(&mut mmu, &mut vpu, &mut hrc, total, 40 * 341);

    let fb = vpu.framebuffer();
    assert_eq!(
        fb[0],
        Rgba {
            r: 255,
            g: 0,
            b: 0,
            a: 255
        }
    );
}

#[test]
fn higher_priority_sprite_wins_over_lower_priority_one_at_the_same_pixel() {
    let mut cart = blank_cart();
    cart.tile_swap[0][0x40] = 0x10; // sprite tile #2, row 0 byte 0: nibble 1
    cart.tile_swap[0][0x60] = 0x20; // sprite tile #3, row 0 byte 0: nibble 2

    let mut mmu = Mmu::new(&cart);
    let mut vpu = Vpu::new();
    let mut hrc = Hrc::new();

    let mut palette = vec![0u8; 256 * 3];
    palette[10 * 3] = 0; // pal_fixed[10] = blue
    palette[10 * 3 + 1] = 0;
    palette[10 * 3 + 2] = 255;
    palette[11 * 3] = 0; // pal_fixed[11] = green
    palette[11 * 3 + 1] = 255;
    palette[11 * 3 + 2] = 0;
    vpu.load_palette(&palette);

    let total = run_to_first_vblank(&mut mmu, &mut vpu, &mut hrc);

    vpu.cpu_write(0xB81, 0x00); // sprite palette bank 0
    vpu.cpu_write(0xB00, 0); // group 0 x
    vpu.cpu_write(0xB01, 0); // group 0 y

    // Sprite 0: enabled, depth 2, group 0, no offset, tile #2.
    vpu.cpu_write(0xA00, 0b1010_0000);
    vpu.cpu_write(0xA01, 0);
    vpu.cpu_write(0xA02, 0x88); // xoffset field 8, yoffset field 8 -> 0,0
    vpu.cpu_write(0xA03, 2);

    // Sprite 1: enabled, depth 5, same group/position, tile #3.
    vpu.cpu_write(0xA04, 0b1101_0000);
    vpu.cpu_write(0xA05, 0);
    vpu.cpu_write(0xA06, 0x88);
    vpu.cpu_write(0xA07, 3);

    // Palette indices the two tiles' nibble values resolve to.
    vpu.cpu_write(0x901, 10); // sprite palette bank 0, index 1 -> blue
    vpu.cpu_write(0x902, 11); // sprite palette bank 0, index 2 -> green

    run_cycles(&mut mmu, &mut vpu, &mut hrc, total, 40 * 341);

    let fb = vpu.framebuffer();
    assert_eq!(
        fb[0],
        Rgba {
            r: 0,
            g: 0,
            b: 255,
            a: 255
        },
        "the depth-2 sprite's color should win over the depth-5 one"
    );
}

#[test]
fn hmirror_reads_a_sprite_tile_row_back_to_front() {
    let mut cart = blank_cart();
    // Sprite tile #2, row 0: leftmost byte (nibble 1) and rightmost byte
    // (nibble 4), at tile-bank offsets 0x40 and 0x43.
    cart.tile_swap[0][0x40] = 0x12;
    cart.tile_swap[0][0x43] = 0x34;

    let mut mmu = Mmu::new(&cart);
    let mut vpu = Vpu::new();
    let mut hrc = Hrc::new();

    let mut palette = vec![0u8; 256 * 3];
    palette[10 * 3 + 2] = 255; // pal_fixed[10] = blue
    palette[20 * 3] = 255;
    palette[20 * 3 + 1] = 255; // pal_fixed[20] = yellow
    vpu.load_palette(&palette);

    let total = run_to_first_vblank(&mut mmu, &mut vpu, &mut hrc);

    vpu.cpu_write(0xB81, 0x00);
    vpu.cpu_write(0xB00, 0);
    vpu.cpu_write(0xB01, 0);

    // Enabled, depth 0, hmirror set, group 0, no offset, tile #2.
    vpu.cpu_write(0xA00, 0b1000_1000);
    vpu.cpu_write(0xA01, 0);
    vpu.cpu_write(0xA02, 0x88);
    vpu.cpu_write(0xA03, 2);

    vpu.cpu_write(0x901, 10); // nibble 1 -> blue
    vpu.cpu_write(0x904, 20); // nibble 4 -> yellow

    run_cycles(&mut mmu, &mut vpu, &mut hrc, total, 40 * 341);

    let fb = vpu.framebuffer();
    assert_eq!(
        fb[0],
        Rgba {
            r: 255,
            g: 255,
            b: 0,
            a: 255
        },
        "hmirror should show the tile's rightmost column at the sprite's leftmost pixel"
    );
}

#[test]
fn vmirror_reads_a_sprite_tile_bottom_row_first() {
    let mut cart = blank_cart();
    // Sprite tile #2: row 0 byte 0 (offset 0x40) and row 7 byte 0 (offset
    // 0x5C, since each row is 4 bytes: 0x40 + 7*4).
    cart.tile_swap[0][0x40] = 0x10;
    cart.tile_swap[0][0x5C] = 0x20;

    let mut mmu = Mmu::new(&cart);
    let mut vpu = Vpu::new();
    let mut hrc = Hrc::new();

    let mut palette = vec![0u8; 256 * 3];
    palette[10 * 3 + 2] = 255; // pal_fixed[10] = blue
    palette[20 * 3 + 1] = 255; // pal_fixed[20] = green
    vpu.load_palette(&palette);

    let total = run_to_first_vblank(&mut mmu, &mut vpu, &mut hrc);

    vpu.cpu_write(0xB81, 0x00);
    vpu.cpu_write(0xB00, 0);
    vpu.cpu_write(0xB01, 0);

    // Enabled, depth 0, vmirror set, group 0, no offset, tile #2.
    vpu.cpu_write(0xA00, 0b1000_0010);
    vpu.cpu_write(0xA01, 0);
    vpu.cpu_write(0xA02, 0x88);
    vpu.cpu_write(0xA03, 2);

    vpu.cpu_write(0x901, 10); // row 0 nibble -> blue
    vpu.cpu_write(0x902, 20); // row 7 nibble -> green

    run_cycles(&mut mmu, &mut vpu, &mut hrc, total, 40 * 341);

    let fb = vpu.framebuffer();
    assert_eq!(
        fb[0],
        Rgba {
            r: 0,
            g: 255,
            b: 0,
            a: 255
        },
        "vmirror should show the tile's bottom row at the sprite's top screen row"
    );
}
