//! The CPU (`spec.md` §4.1): an 8-register micro-cycle state machine driven
//! one master cycle at a time. Grounded on `original_source/src/core/cpu/cpu.c`
//! for the overall fetch/decode/execute-over-several-cycles shape
//! (`core_cpu_i_cycle`'s `i_cycles` counter), reworked here as a tagged
//! `Activity` enum advanced by `step` instead of the original's per-opcode
//! function-pointer table (`spec.md` §9).

pub mod alu;
pub mod decode;

pub use alu::{FLAG_C, FLAG_I, FLAG_N, FLAG_O, FLAG_Z};
pub use decode::{AddrMode, Opcode};

use crate::core::interrupt::InterruptLine;
use crate::mmu::Mmu;

pub const R_A: usize = 0;
pub const R_B: usize = 1;
pub const R_C: usize = 2;
pub const R_D: usize = 3;
pub const R_E: usize = 4;
pub const R_P: usize = 5;
pub const R_S: usize = 6;
pub const R_F: usize = 7;

/// Software-interrupt (`INT` opcode) vector: fixed, distinct from the four
/// hardware lines' own vectors in `core::InterruptLine::vector_addr`.
const SOFTWARE_INT_VECTOR: u16 = 0xFFFE;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Activity {
    Idle,
    Decode,
    BinaryData,
    BinarySrcPtr,
    BinaryDstOld,
    BinaryWriteback,
    UnaryReadPtr,
    UnaryWriteback,
    BranchDataFetched,
    BranchPtrFetched,
    BranchPtrRead,
    BranchCallWrite { target: u16 },
    IntPushedF,
    IntPushedP,
    IntReadVec,
    RtiReadF,
    RtiReadP,
    RtsReadP,
    HwPushedF,
    HwPushedP,
    HwReadVec,
}

struct Decoded {
    width_word: bool,
    opcode: Opcode,
    mode: AddrMode,
    rx: usize,
    ry: usize,
}

/// The 8-register file, flags, and the posted-transaction-driven fetch/
/// execute state machine.
pub struct Cpu {
    pub r: [u16; 8],
    activity: Activity,
    dec: Option<Decoded>,
    data: u16,
    ptr_addr: u16,
    dst_old: u16,
    hw_vector: u16,
    pending_interrupt: Option<InterruptLine>,
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            r: [0; 8],
            activity: Activity::Idle,
            dec: None,
            data: 0,
            ptr_addr: 0,
            dst_old: 0,
            hw_vector: 0,
            pending_interrupt: None,
        }
    }

    /// Request a hardware interrupt. `spec.md` §4.1: a single in-flight
    /// slot; a higher- or equal-priority request overrides a lower one that
    /// hasn't begun dispatch yet, a pending lower-priority one never bumps
    /// a higher one already waiting.
    pub fn request_interrupt(&mut self, line: InterruptLine) {
        match self.pending_interrupt {
            None => self.pending_interrupt = Some(line),
            Some(current) if line.supersedes(current) => self.pending_interrupt = Some(line),
            Some(_) => {}
        }
    }

    fn d(&self) -> &Decoded {
        self.dec.as_ref().expect("decode state missing mid-instruction")
    }

    fn flag(&self, mask: u16) -> bool {
        self.r[R_F] & mask != 0
    }

    fn set_flags(&mut self, bits: u16) {
        self.r[R_F] = (self.r[R_F] & !alu::ARITH_MASK) | bits;
    }

    /// Advance by exactly one master cycle.
    pub fn step(&mut self, mmu: &mut Mmu) {
        match self.activity {
            Activity::Idle => self.start_next(mmu),
            Activity::Decode => self.decode(mmu),
            Activity::BinaryData => self.binary_data(mmu),
            Activity::BinarySrcPtr => self.binary_src_ptr(mmu),
            Activity::BinaryDstOld => self.binary_dst_old(mmu),
            Activity::BinaryWriteback => {
                self.activity = Activity::Idle;
            }
            Activity::UnaryReadPtr => self.unary_read_ptr(mmu),
            Activity::UnaryWriteback => {
                self.activity = Activity::Idle;
            }
            Activity::BranchDataFetched => self.branch_data_fetched(mmu),
            Activity::BranchPtrFetched => self.branch_ptr_fetched(mmu),
            Activity::BranchPtrRead => self.branch_ptr_read(mmu),
            Activity::BranchCallWrite { target } => {
                self.r[R_P] = target;
                self.activity = Activity::Idle;
            }
            Activity::IntPushedF => self.int_pushed_f(mmu),
            Activity::IntPushedP => self.int_pushed_p(mmu),
            Activity::IntReadVec => self.int_read_vec(mmu),
            Activity::RtiReadF => self.rti_read_f(mmu),
            Activity::RtiReadP => self.rti_read_p(mmu),
            Activity::RtsReadP => self.rts_read_p(mmu),
            Activity::HwPushedF => self.hw_pushed_f(mmu),
            Activity::HwPushedP => self.hw_pushed_p(mmu),
            Activity::HwReadVec => self.hw_read_vec(mmu),
        }
    }

    fn push_w(&mut self, mmu: &mut Mmu, value: u16) {
        self.r[R_S] = self.r[R_S].wrapping_sub(2);
        mmu.ww_send_cpu(self.r[R_S], value);
    }

    fn start_next(&mut self, mmu: &mut Mmu) {
        // spec.md §4.1: dispatched only while globally enabled (F & I); a
        // request that arrives while masked stays pending indefinitely
        // rather than being dropped.
        if self.r[R_F] & FLAG_I != 0 {
            if let Some(line) = self.pending_interrupt.take() {
                self.hw_vector = line.vector_addr();
                self.push_w(mmu, self.r[R_F]);
                self.activity = Activity::HwPushedF;
                return;
            }
        }
        mmu.rw_send_cpu(self.r[R_P]);
        self.r[R_P] = self.r[R_P].wrapping_add(2);
        self.activity = Activity::Decode;
    }

    fn decode(&mut self, mmu: &mut Mmu) {
        let word = mmu.rw_fetch_cpu();
        let raw = decode::decode((word & 0xFF) as u8, (word >> 8) as u8);
        let opcode = raw.opcode;
        let mode = raw.mode;
        self.dec = Some(Decoded {
            width_word: raw.width_word,
            opcode,
            mode,
            rx: raw.rx as usize,
            ry: raw.ry as usize,
        });

        if opcode.is_void() {
            match opcode {
                Opcode::Nop => self.activity = Activity::Idle,
                Opcode::Int => {
                    self.push_w(mmu, self.r[R_F]);
                    self.activity = Activity::IntPushedF;
                }
                Opcode::Rti => {
                    mmu.rw_send_cpu(self.r[R_S]);
                    self.activity = Activity::RtiReadF;
                }
                Opcode::Rts => {
                    mmu.rw_send_cpu(self.r[R_S]);
                    self.activity = Activity::RtsReadP;
                }
                _ => unreachable!("opcode.is_void() only matches Nop/Int/Rti/Rts"),
            }
            return;
        }

        if opcode.is_branch() {
            self.begin_branch(mmu, mode);
            return;
        }

        if mode.has_data() {
            let len = mode.data_len(raw.width_word);
            if len == 2 {
                mmu.rw_send_cpu(self.r[R_P]);
            } else {
                mmu.rb_send_cpu(self.r[R_P]);
            }
            self.r[R_P] = self.r[R_P].wrapping_add(len as u16);
            self.activity = Activity::BinaryData;
        } else if mode.is_dr_only() {
            self.exec_register_form();
        } else {
            // Single-operand pointer mode (AddrMode::Ir): read-modify-write
            // through the register-indirect address, no trailing data.
            self.ptr_addr = self.r[self.d().rx];
            let width = if self.d().width_word { 2 } else { 1 };
            if width == 2 {
                mmu.rw_send_cpu(self.ptr_addr);
            } else {
                mmu.rb_send_cpu(self.ptr_addr);
            }
            self.activity = Activity::UnaryReadPtr;
        }
    }

    fn exec_register_form(&mut self) {
        let d = self.d();
        let opcode = d.opcode;
        let width_word = d.width_word;
        let rx = d.rx;
        let ry = d.ry;
        let (result, flags) = match d.mode {
            AddrMode::Dr => alu::apply_unary(opcode, width_word, self.r[rx]),
            AddrMode::DrDr => alu::apply_binary(opcode, width_word, self.r[rx], self.r[ry]),
            _ => unreachable!("exec_register_form only called for dr_only modes"),
        };
        if !matches!(opcode, Opcode::Cmp | Opcode::Tst) {
            self.r[rx] = result;
        }
        self.set_flags(flags);
        self.activity = Activity::Idle;
    }

    fn binary_data(&mut self, mmu: &mut Mmu) {
        let d = self.d();
        let len = d.mode.data_len(d.width_word);
        self.data = if len == 2 { mmu.rw_fetch_cpu() } else { mmu.rb_fetch_cpu() as u16 };
        let mode = d.mode;
        let opcode = d.opcode;
        let width_word = d.width_word;
        let rx = d.rx;

        match mode {
            AddrMode::DrDb | AddrMode::DrDw => {
                let (result, flags) = alu::apply_binary(opcode, width_word, self.r[rx], self.data);
                if !matches!(opcode, Opcode::Cmp | Opcode::Tst) {
                    self.r[rx] = result;
                }
                self.set_flags(flags);
                self.activity = Activity::Idle;
            }
            AddrMode::DrIb | AddrMode::DrIw => {
                self.ptr_addr = self.ptr_from_data(mode);
                if width_word {
                    mmu.rw_send_cpu(self.ptr_addr);
                } else {
                    mmu.rb_send_cpu(self.ptr_addr);
                }
                self.activity = Activity::BinarySrcPtr;
            }
            AddrMode::IbDr | AddrMode::IwDr => {
                self.ptr_addr = self.ptr_from_data(mode);
                if matches!(opcode, Opcode::Mv) {
                    if width_word {
                        mmu.ww_send_cpu(self.ptr_addr, self.r[rx]);
                    } else {
                        mmu.wb_send_cpu(self.ptr_addr, self.r[rx] as u8);
                    }
                    self.activity = Activity::BinaryWriteback;
                } else {
                    if width_word {
                        mmu.rw_send_cpu(self.ptr_addr);
                    } else {
                        mmu.rb_send_cpu(self.ptr_addr);
                    }
                    self.activity = Activity::BinaryDstOld;
                }
            }
            AddrMode::Ib | AddrMode::Iw => {
                self.ptr_addr = self.ptr_from_data(mode);
                if width_word {
                    mmu.rw_send_cpu(self.ptr_addr);
                } else {
                    mmu.rb_send_cpu(self.ptr_addr);
                }
                self.activity = Activity::UnaryReadPtr;
            }
            _ => unreachable!("binary_data only reached via has_data modes"),
        }
    }

    fn ptr_from_data(&self, mode: AddrMode) -> u16 {
        match mode {
            AddrMode::DrIb | AddrMode::IbDr | AddrMode::Ib => {
                self.r[R_P].wrapping_sub(1).wrapping_add(self.data)
            }
            AddrMode::DrIw | AddrMode::IwDr | AddrMode::Iw => self.data,
            _ => unreachable!(),
        }
    }

    fn binary_src_ptr(&mut self, mmu: &mut Mmu) {
        let d = self.d();
        let width_word = d.width_word;
        let opcode = d.opcode;
        let rx = d.rx;
        let src = if width_word { mmu.rw_fetch_cpu() } else { mmu.rb_fetch_cpu() as u16 };
        let (result, flags) = alu::apply_binary(opcode, width_word, self.r[rx], src);
        if !matches!(opcode, Opcode::Cmp | Opcode::Tst) {
            self.r[rx] = result;
        }
        self.set_flags(flags);
        self.activity = Activity::Idle;
    }

    fn binary_dst_old(&mut self, mmu: &mut Mmu) {
        let d = self.d();
        let width_word = d.width_word;
        let opcode = d.opcode;
        let rx = d.rx;
        self.dst_old = if width_word { mmu.rw_fetch_cpu() } else { mmu.rb_fetch_cpu() as u16 };
        let (result, flags) = alu::apply_binary(opcode, width_word, self.dst_old, self.r[rx]);
        self.set_flags(flags);
        if !matches!(opcode, Opcode::Cmp | Opcode::Tst) {
            if width_word {
                mmu.ww_send_cpu(self.ptr_addr, result);
            } else {
                mmu.wb_send_cpu(self.ptr_addr, result as u8);
            }
            self.activity = Activity::BinaryWriteback;
        } else {
            self.activity = Activity::Idle;
        }
    }

    fn unary_read_ptr(&mut self, mmu: &mut Mmu) {
        let d = self.d();
        let width_word = d.width_word;
        let opcode = d.opcode;
        let old = if width_word { mmu.rw_fetch_cpu() } else { mmu.rb_fetch_cpu() as u16 };
        let (result, flags) = alu::apply_unary(opcode, width_word, old);
        self.set_flags(flags);
        if width_word {
            mmu.ww_send_cpu(self.ptr_addr, result);
        } else {
            mmu.wb_send_cpu(self.ptr_addr, result as u8);
        }
        self.activity = Activity::UnaryWriteback;
    }

    // -- Branches / calls (spec.md §4.1: operand is always evaluated, even
    //    when the branch is not taken) -----------------------------------

    fn begin_branch(&mut self, mmu: &mut Mmu, mode: AddrMode) {
        let width_word = self.d().width_word;
        match mode {
            AddrMode::Dr => {
                let target = self.r[self.d().rx];
                self.resolve_branch(mmu, target);
            }
            AddrMode::Ir => {
                self.ptr_addr = self.r[self.d().rx];
                if width_word {
                    mmu.rw_send_cpu(self.ptr_addr);
                } else {
                    mmu.rb_send_cpu(self.ptr_addr);
                }
                self.activity = Activity::BranchPtrRead;
            }
            AddrMode::Db | AddrMode::Dw => {
                let len = mode.data_len(width_word).max(if width_word { 2 } else { 1 });
                if len == 2 {
                    mmu.rw_send_cpu(self.r[R_P]);
                } else {
                    mmu.rb_send_cpu(self.r[R_P]);
                }
                self.r[R_P] = self.r[R_P].wrapping_add(len as u16);
                self.activity = Activity::BranchDataFetched;
            }
            AddrMode::Ib | AddrMode::Iw => {
                let len = if matches!(mode, AddrMode::Iw) { 2 } else { 1 };
                if len == 2 {
                    mmu.rw_send_cpu(self.r[R_P]);
                } else {
                    mmu.rb_send_cpu(self.r[R_P]);
                }
                self.r[R_P] = self.r[R_P].wrapping_add(len as u16);
                self.activity = Activity::BranchPtrFetched;
            }
            _ => {
                // Reserved / two-operand encodings are not valid branch
                // targets; treat as a no-op rather than panicking on
                // malformed bytecode.
                self.activity = Activity::Idle;
            }
        }
    }

    fn branch_data_fetched(&mut self, mmu: &mut Mmu) {
        let width_word = self.d().width_word;
        let target = if width_word { mmu.rw_fetch_cpu() } else { mmu.rb_fetch_cpu() as u16 };
        self.resolve_branch(mmu, target);
    }

    fn branch_ptr_fetched(&mut self, mmu: &mut Mmu) {
        let d = self.d();
        let data = if matches!(d.mode, AddrMode::Iw) {
            mmu.rw_fetch_cpu()
        } else {
            mmu.rb_fetch_cpu() as u16
        };
        self.ptr_addr = match d.mode {
            AddrMode::Iw => data,
            AddrMode::Ib => self.r[R_P].wrapping_sub(1).wrapping_add(data),
            _ => unreachable!(),
        };
        if d.width_word {
            mmu.rw_send_cpu(self.ptr_addr);
        } else {
            mmu.rb_send_cpu(self.ptr_addr);
        }
        self.activity = Activity::BranchPtrRead;
    }

    fn branch_ptr_read(&mut self, mmu: &mut Mmu) {
        let width_word = self.d().width_word;
        let target = if width_word { mmu.rw_fetch_cpu() } else { mmu.rb_fetch_cpu() as u16 };
        self.resolve_branch(mmu, target);
    }

    fn taken(&self) -> bool {
        match self.d().opcode.branch_flag() {
            Some(mask) => self.flag(mask),
            None => true,
        }
    }

    fn resolve_branch(&mut self, mmu: &mut Mmu, target: u16) {
        let taken = self.taken();
        let is_call = self.d().opcode.is_call();
        if !taken {
            self.activity = Activity::Idle;
            return;
        }
        if is_call {
            self.push_w(mmu, self.r[R_P]);
            self.activity = Activity::BranchCallWrite { target };
        } else {
            self.r[R_P] = target;
            self.activity = Activity::Idle;
        }
    }

    // -- Software INT / RTI / RTS -----------------------------------------

    fn int_pushed_f(&mut self, mmu: &mut Mmu) {
        self.push_w(mmu, self.r[R_P]);
        self.activity = Activity::IntPushedP;
    }
    fn int_pushed_p(&mut self, mmu: &mut Mmu) {
        mmu.rw_send_cpu(SOFTWARE_INT_VECTOR);
        self.activity = Activity::IntReadVec;
    }
    fn int_read_vec(&mut self, mmu: &mut Mmu) {
        self.r[R_P] = mmu.rw_fetch_cpu();
        self.r[R_F] |= FLAG_I;
        self.activity = Activity::Idle;
    }

    fn rti_read_f(&mut self, mmu: &mut Mmu) {
        self.r[R_F] = mmu.rw_fetch_cpu();
        self.r[R_S] = self.r[R_S].wrapping_add(2);
        mmu.rw_send_cpu(self.r[R_S]);
        self.activity = Activity::RtiReadP;
    }
    fn rti_read_p(&mut self, mmu: &mut Mmu) {
        self.r[R_P] = mmu.rw_fetch_cpu();
        self.r[R_S] = self.r[R_S].wrapping_add(2);
        self.activity = Activity::Idle;
    }

    fn rts_read_p(&mut self, mmu: &mut Mmu) {
        self.r[R_P] = mmu.rw_fetch_cpu();
        self.r[R_S] = self.r[R_S].wrapping_add(2);
        self.activity = Activity::Idle;
    }

    // -- Hardware interrupt dispatch ---------------------------------------

    fn hw_pushed_f(&mut self, mmu: &mut Mmu) {
        self.push_w(mmu, self.r[R_P]);
        self.activity = Activity::HwPushedP;
    }
    fn hw_pushed_p(&mut self, mmu: &mut Mmu) {
        mmu.rw_send_cpu(self.hw_vector);
        self.activity = Activity::HwReadVec;
    }
    fn hw_read_vec(&mut self, mmu: &mut Mmu) {
        self.r[R_P] = mmu.rw_fetch_cpu();
        self.r[R_F] |= FLAG_I;
        self.activity = Activity::Idle;
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
