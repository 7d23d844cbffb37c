//! Top-level machine: owns the CPU/MMU/VPU/HRC and drives them one master
//! cycle at a time, in the fixed order `spec.md` §2 mandates: resolve the
//! bus, advance the VPU and timer, arbitrate whichever interrupt lines
//! fired this cycle, then advance the CPU (`spec.md` §2, §4.3).

use crate::cart::{self, Cart, CartError};
use crate::core::InterruptLine;
use crate::cpu::Cpu;
use crate::hrc::Hrc;
use crate::mmu::Mmu;
use crate::vpu::{Rgba, Vpu};

/// A fully assembled machine, ready to be stepped cycle by cycle.
pub struct System {
    cpu: Cpu,
    mmu: Mmu,
    vpu: Vpu,
    hrc: Hrc,
    total_cycles: u64,
}

impl System {
    /// Parse a ROM image and build the machine around it (`spec.md` §4.5).
    pub fn from_rom_bytes(bytes: &[u8]) -> Result<Self, CartError> {
        let cart = cart::load_rom(bytes)?;
        Ok(Self::from_cart(&cart))
    }

    pub fn from_cart(cart: &Cart) -> Self {
        Self {
            cpu: Cpu::new(),
            mmu: Mmu::new(cart),
            vpu: Vpu::new(),
            hrc: Hrc::new(),
            total_cycles: 0,
        }
    }

    /// Advance the whole machine by exactly one master cycle.
    ///
    /// Order matters (`spec.md` §2): resolve the bus first so the fetch
    /// registers CPU and VPU are about to read reflect last cycle's posted
    /// transactions, then the VPU and timer run (either may request an
    /// interrupt this very cycle), then the highest-priority pending
    /// request is handed to the CPU, and finally the CPU itself steps.
    pub fn step_cycle(&mut self) {
        self.mmu.update(&mut self.vpu, &mut self.hrc);

        let video_req = self.vpu.step(&mut self.mmu, self.total_cycles);
        let timer_req = if self.hrc.step(self.total_cycles) {
            Some(InterruptLine::Timer)
        } else {
            None
        };

        for req in [video_req, timer_req] {
            if let Some(line) = req {
                self.cpu.request_interrupt(line);
            }
        }

        self.cpu.step(&mut self.mmu);
        self.total_cycles = self.total_cycles.wrapping_add(1);
    }

    /// Request the User interrupt line (`spec.md` §4.3: the one source not
    /// raised internally by the VPU or HRC — typically wired to a host-side
    /// button or IPC event by the frontend).
    pub fn request_user_interrupt(&mut self) {
        self.cpu.request_interrupt(InterruptLine::User);
    }

    /// Current front buffer, ready for display (`spec.md` §4.4: copied out
    /// of the back buffer under lock at the start of each VBlank).
    pub fn framebuffer(&self) -> std::sync::MutexGuard<'_, Vec<Rgba>> {
        self.vpu.framebuffer()
    }

    /// Load a fixed 256-entry RGB palette (`system::palette`'s 768-byte
    /// file format) into the VPU.
    pub fn load_palette(&mut self, data: &[u8]) {
        self.vpu.load_palette(data);
    }

    pub fn set_input(&mut self, pad: u8, mask: u16) {
        self.mmu.set_gamepad(pad, mask);
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::{self, AddrMode, Opcode};
    use crate::cpu::FLAG_I;

    const R_P: usize = 5;
    const R_F: usize = 7;

    fn blank_cart() -> Cart {
        let mut bytes = vec![0u8; cart::HEADER_LEN];
        bytes[0..4].copy_from_slice(b"KHPR");
        let total = bytes.len() as u32;
        bytes[4..8].copy_from_slice(&total.to_le_bytes());
        cart::load_rom(&bytes).unwrap()
    }

    #[test]
    fn step_cycle_runs_without_panicking_on_blank_rom() {
        let mut sys = System::from_cart(&blank_cart());
        for _ in 0..10_000 {
            sys.step_cycle();
        }
        assert_eq!(sys.total_cycles(), 10_000);
    }

    #[test]
    fn vblank_interrupt_is_eventually_delivered_to_the_cpu() {
        // NOP-loop program at the reset vector; the VPU's own VBlank
        // request should preempt the next fetch without any hand in the
        // program itself.
        let mut cart = blank_cart();
        let (ib0, ib1) = decode::encode(Opcode::Jp, AddrMode::Db, false, 0, 0);
        cart.rom_fixed[0] = ib0;
        cart.rom_fixed[1] = ib1;
        cart.rom_fixed[2] = 0; // jump target low byte: loop to self

        let mut sys = System::from_cart(&cart);
        sys.cpu.r[R_F] = FLAG_I; // interrupts globally enabled, as startup code would do
        sys.mmu.ww_send_cpu(0xFFFA, 0x0100); // video vector, distinct from the reset vector
        sys.mmu.update(&mut sys.vpu, &mut sys.hrc);

        // One full frame is 341 * 262 cycles; run a couple of frames so a
        // VBlank fires regardless of where in the frame we started.
        let two_frames = 341u64 * 262 * 2;
        let mut dispatched = false;
        for _ in 0..two_frames {
            sys.step_cycle();
            if sys.cpu.r[R_P] == 0x0100 {
                dispatched = true;
                break;
            }
        }

        assert!(dispatched, "video interrupt never reached its vector");
        assert_eq!(sys.cpu.r[R_F] & FLAG_I, FLAG_I);
    }

    #[test]
    fn gamepad_state_reaches_the_bus() {
        let mut sys = System::from_cart(&blank_cart());
        sys.set_input(0, 0xABCD);
        sys.step_cycle();
        // No direct read API from here; this just exercises that wiring
        // input through doesn't panic and the mmu stays addressable.
        sys.step_cycle();
    }
}
