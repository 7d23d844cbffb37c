//! Memory Management Unit (`spec.md` §4.2): owns every memory bank, decodes
//! the 64 KiB address space, and arbitrates the CPU's and VPU's posted
//! transactions. Grounded on `original_source/src/core/mmu/mmu.h`, which
//! keeps the same address constants and the same two-step
//! `*_send`/`*_fetch` request shape this module implements. Replaces the
//! original's web of raw bank pointers with owned arrays, per `spec.md` §9
//! ("arena + typed indices").

use std::sync::atomic::{AtomicU16, Ordering};

use crate::cart::Cart;
use crate::core::bus::{BankKind, BusTransaction, TransactionKind};
use crate::hrc::Hrc;
use crate::vpu::Vpu;
use crate::warn_log;

const A_ROM_FIXED_END: u16 = 0x3FFF;
const A_ROM_SWAP_END: u16 = 0x7FFF;
const A_RAM_FIXED_END: u16 = 0x9FFF;
const A_RAM_SWAP_END: u16 = 0xBFFF;
const A_TILE_SWAP_END: u16 = 0xDFFF;
const A_VPU_END: u16 = 0xEBFF;
const A_TILE_BANK_SELECT: u16 = 0xEB90;
const A_APU_END: u16 = 0xEFFF;
const A_DPCM_BANK_SELECT: u16 = 0xECF0;
const A_DPCM_SWAP_END: u16 = 0xF7FF;
const A_FIXED0_END: u16 = 0xFDFF;
const A_CART_FIXED_END: u16 = 0xFEFF;
const A_FIXED1_END: u16 = 0xFFDF;
const A_ROM_BANK_SELECT: u16 = 0xFFE0;
const A_RAM_BANK_SELECT: u16 = 0xFFE1;
const A_HIRES_CTR: u16 = 0xFFE2;
const A_HIRES_CTR_END: u16 = 0xFFE3;
const A_PAD_END: u16 = 0xFFF3;
const A_SERIAL_END: u16 = 0xFFF7;
const A_INT_VEC: u16 = 0xFFF8;

pub struct Mmu {
    rom_fixed: Vec<u8>,
    rom_swap: Vec<Vec<u8>>,
    rom_bank: usize,
    ram_fixed: Vec<u8>,
    ram_swap: Vec<Vec<u8>>,
    ram_bank: usize,
    tile_swap: Vec<Vec<u8>>,
    tile_bank: usize,
    dpcm_swap: Vec<Vec<u8>>,
    dpcm_bank: usize,
    cart_persist: [u8; 256],
    misc0: [u8; (A_FIXED0_END - A_APU_END) as usize],
    misc1: [u8; (A_FIXED1_END - A_PAD_END) as usize],
    intvec: [u16; 4],
    /// 16-bit per-pad button masks. Atomic so a host write (`set_input`,
    /// release) can never be observed half-written by a CPU read (acquire)
    /// — `spec.md` §5's "no torn reads of 16-bit input words".
    gamepad: [AtomicU16; 2],
    serial: [u8; 4],

    cpu_pending: BusTransaction,
    vpu_pending: BusTransaction,
    cpu_fetch: u16,
    vpu_fetch: u16,
}

impl Mmu {
    pub fn new(cart: &Cart) -> Self {
        Self {
            rom_fixed: cart.rom_fixed.clone(),
            rom_swap: cart.rom_swap.clone(),
            rom_bank: 0,
            ram_fixed: cart.ram_fixed.clone(),
            ram_swap: cart.ram_swap.clone(),
            ram_bank: 0,
            tile_swap: cart.tile_swap.clone(),
            tile_bank: 0,
            dpcm_swap: cart.dpcm_swap.clone(),
            dpcm_bank: 0,
            cart_persist: [0; 256],
            misc0: [0; (A_FIXED0_END - A_APU_END) as usize],
            misc1: [0; (A_FIXED1_END - A_PAD_END) as usize],
            intvec: [0; 4],
            gamepad: [AtomicU16::new(0xFFFF), AtomicU16::new(0xFFFF)],
            serial: [0; 4],
            cpu_pending: BusTransaction::none(),
            vpu_pending: BusTransaction::none(),
            cpu_fetch: 0,
            vpu_fetch: 0,
        }
    }

    // -- Posted-transaction API (spec.md §4.2) -------------------------------

    pub fn rb_send_cpu(&mut self, addr: u16) {
        self.cpu_pending = BusTransaction::read(addr, 1);
    }
    pub fn rb_fetch_cpu(&self) -> u8 {
        self.cpu_fetch as u8
    }
    pub fn wb_send_cpu(&mut self, addr: u16, value: u8) {
        self.cpu_pending = BusTransaction::write(addr, value as u16, 1);
    }
    pub fn rw_send_cpu(&mut self, addr: u16) {
        self.cpu_pending = BusTransaction::read(addr, 2);
    }
    pub fn rw_fetch_cpu(&self) -> u16 {
        self.cpu_fetch
    }
    pub fn ww_send_cpu(&mut self, addr: u16, value: u16) {
        self.cpu_pending = BusTransaction::write(addr, value, 2);
    }

    pub fn rb_send_vpu(&mut self, addr: u16) {
        self.vpu_pending = BusTransaction::read(addr, 1);
    }
    pub fn rb_fetch_vpu(&self) -> u8 {
        self.vpu_fetch as u8
    }
    pub fn rw_send_vpu(&mut self, addr: u16) {
        self.vpu_pending = BusTransaction::read(addr, 2);
    }
    pub fn rw_fetch_vpu(&self) -> u16 {
        self.vpu_fetch
    }

    pub fn bank_select(&mut self, kind: BankKind, index: u8) {
        match kind {
            BankKind::Rom => {
                let total = self.rom_swap.len().max(1);
                self.rom_bank = (index as usize).min(total - 1);
            }
            BankKind::Ram => {
                let total = self.ram_swap.len().max(1);
                self.ram_bank = (index as usize).min(total - 1);
            }
            BankKind::Tile => {
                let total = self.tile_swap.len().max(1);
                self.tile_bank = (index as usize).min(total - 1);
            }
            BankKind::Dpcm => {
                let total = self.dpcm_swap.len().max(1);
                self.dpcm_bank = (index as usize).min(total - 1);
            }
        }
    }

    /// Resolve both pending transactions, making their effects (or, for
    /// reads, their results) visible starting next cycle. Called once per
    /// master cycle, before the VPU and CPU advance (`spec.md` §2, §5).
    pub fn update(&mut self, vpu: &mut Vpu, hrc: &mut Hrc) {
        if self.cpu_pending.kind != TransactionKind::None {
            let t = self.cpu_pending;
            self.cpu_pending = BusTransaction::none();
            match t.kind {
                TransactionKind::Read => {
                    self.cpu_fetch = if t.width == 1 {
                        self.read_b(t.addr, vpu, hrc) as u16
                    } else {
                        self.read_w(t.addr, vpu, hrc)
                    };
                }
                TransactionKind::Write => {
                    if t.width == 1 {
                        self.write_b(t.addr, t.value as u8, vpu, hrc);
                    } else {
                        self.write_w(t.addr, t.value, vpu, hrc);
                    }
                }
                TransactionKind::None => {}
            }
        }

        if self.vpu_pending.kind != TransactionKind::None {
            let t = self.vpu_pending;
            self.vpu_pending = BusTransaction::none();
            match t.kind {
                TransactionKind::Read => {
                    self.vpu_fetch = if t.width == 1 {
                        self.read_b(t.addr, vpu, hrc) as u16
                    } else {
                        self.read_w(t.addr, vpu, hrc)
                    };
                }
                TransactionKind::Write => {
                    // The VPU never issues writes in this design (spec.md §9:
                    // "the VPU never mutates main memory"), but the slot is
                    // symmetric with the CPU's for uniformity.
                    if t.width == 1 {
                        self.write_b(t.addr, t.value as u8, vpu, hrc);
                    } else {
                        self.write_w(t.addr, t.value, vpu, hrc);
                    }
                }
                TransactionKind::None => {}
            }
        }
    }

    fn read_w(&mut self, addr: u16, vpu: &mut Vpu, hrc: &mut Hrc) -> u16 {
        let lo = self.read_b(addr, vpu, hrc) as u16;
        let hi = self.read_b(addr.wrapping_add(1), vpu, hrc) as u16;
        lo | (hi << 8)
    }

    fn write_w(&mut self, addr: u16, value: u16, vpu: &mut Vpu, hrc: &mut Hrc) {
        self.write_b(addr, (value & 0xFF) as u8, vpu, hrc);
        self.write_b(addr.wrapping_add(1), (value >> 8) as u8, vpu, hrc);
    }

    fn read_b(&mut self, addr: u16, vpu: &mut Vpu, hrc: &mut Hrc) -> u8 {
        match addr {
            0..=A_ROM_FIXED_END => self.rom_fixed[addr as usize],
            a if a <= A_ROM_SWAP_END => {
                self.rom_swap[self.rom_bank][(a - 0x4000) as usize]
            }
            a if a <= A_RAM_FIXED_END => self.ram_fixed[(a - 0x8000) as usize],
            a if a <= A_RAM_SWAP_END => {
                self.ram_swap[self.ram_bank][(a - 0xA000) as usize]
            }
            a if a <= A_TILE_SWAP_END => {
                self.tile_swap[self.tile_bank][(a - 0xC000) as usize]
            }
            A_TILE_BANK_SELECT => self.tile_bank as u8,
            a if a <= A_VPU_END => vpu.cpu_read(a - 0xE000),
            A_DPCM_BANK_SELECT => self.dpcm_bank as u8,
            a if a <= A_APU_END => 0, // APU is stubbed: reads as 0.
            a if a <= A_DPCM_SWAP_END => {
                self.dpcm_swap[self.dpcm_bank][(a - 0xF000) as usize]
            }
            a if a <= A_FIXED0_END => self.misc0[(a - 0xF800) as usize],
            a if a <= A_CART_FIXED_END => self.cart_persist[(a - 0xFE00) as usize],
            a if a <= A_FIXED1_END => self.misc1[(a - 0xFF00) as usize],
            A_ROM_BANK_SELECT => self.rom_bank as u8,
            A_RAM_BANK_SELECT => self.ram_bank as u8,
            A_HIRES_CTR => (hrc.value() & 0xFF) as u8,
            A_HIRES_CTR_END => (hrc.value() >> 8) as u8,
            a if a <= A_PAD_END => {
                let pad = (a - 0xFFF0) / 2;
                let mask = self.gamepad[pad as usize].load(Ordering::Acquire);
                if (a - 0xFFF0) % 2 == 0 {
                    (mask & 0xFF) as u8
                } else {
                    (mask >> 8) as u8
                }
            }
            a if a <= A_SERIAL_END => self.serial[(a - 0xFFF4) as usize],
            a if a >= A_INT_VEC => {
                let idx = ((a - A_INT_VEC) / 2) as usize;
                let word = self.intvec[idx];
                if (a - A_INT_VEC) % 2 == 0 {
                    (word & 0xFF) as u8
                } else {
                    (word >> 8) as u8
                }
            }
            _ => {
                warn_log!("mmu: read from unmapped address {addr:#06x}");
                0
            }
        }
    }

    fn write_b(&mut self, addr: u16, value: u8, vpu: &mut Vpu, hrc: &mut Hrc) {
        match addr {
            0..=A_ROM_SWAP_END => { /* ROM: writes are silently ignored. */ }
            a if a <= A_RAM_FIXED_END => self.ram_fixed[(a - 0x8000) as usize] = value,
            a if a <= A_RAM_SWAP_END => {
                self.ram_swap[self.ram_bank][(a - 0xA000) as usize] = value
            }
            a if a <= A_TILE_SWAP_END => {
                self.tile_swap[self.tile_bank][(a - 0xC000) as usize] = value
            }
            A_TILE_BANK_SELECT => self.bank_select(BankKind::Tile, value),
            a if a <= A_VPU_END => vpu.cpu_write(a - 0xE000, value),
            A_DPCM_BANK_SELECT => self.bank_select(BankKind::Dpcm, value),
            a if a <= A_APU_END => { /* APU is stubbed: writes ignored. */ }
            a if a <= A_DPCM_SWAP_END => {
                self.dpcm_swap[self.dpcm_bank][(a - 0xF000) as usize] = value
            }
            a if a <= A_FIXED0_END => self.misc0[(a - 0xF800) as usize] = value,
            a if a <= A_CART_FIXED_END => self.cart_persist[(a - 0xFE00) as usize] = value,
            a if a <= A_FIXED1_END => self.misc1[(a - 0xFF00) as usize] = value,
            A_ROM_BANK_SELECT => self.bank_select(BankKind::Rom, value),
            A_RAM_BANK_SELECT => self.bank_select(BankKind::Ram, value),
            A_HIRES_CTR => {
                let v = (hrc.value() & 0xFF00) | value as u16;
                hrc.write(v);
            }
            A_HIRES_CTR_END => {
                let v = (hrc.value() & 0x00FF) | ((value as u16) << 8);
                hrc.write(v);
            }
            a if a <= A_PAD_END => { /* Gamepad ports are host-write-only input; CPU writes are ignored. */ }
            a if a <= A_SERIAL_END => self.serial[(a - 0xFFF4) as usize] = value,
            a if a >= A_INT_VEC => {
                let idx = ((a - A_INT_VEC) / 2) as usize;
                let word = self.intvec[idx];
                self.intvec[idx] = if (a - A_INT_VEC) % 2 == 0 {
                    (word & 0xFF00) | value as u16
                } else {
                    (word & 0x00FF) | ((value as u16) << 8)
                };
            }
            _ => {
                warn_log!("mmu: write to unmapped address {addr:#06x}");
            }
        }
    }

    pub fn int_vector(&self, addr: u16) -> u16 {
        let idx = ((addr - A_INT_VEC) / 2) as usize;
        self.intvec[idx]
    }

    pub fn set_gamepad(&mut self, pad: u8, mask: u16) {
        if pad < 2 {
            self.gamepad[pad as usize].store(mask, Ordering::Release);
        }
    }

    pub fn rom_bank(&self) -> usize {
        self.rom_bank
    }
    pub fn ram_bank(&self) -> usize {
        self.ram_bank
    }
    pub fn tile_bank(&self) -> usize {
        self.tile_bank
    }
    pub fn dpcm_bank(&self) -> usize {
        self.dpcm_bank
    }
}
