use kernel_frames::{
    BootPools, ErrorClass, FrameError, FramePoolRegistry, FrameState, PoolId, bring_up,
};
use kernel_info::{FrameRange, MemoryLayout};
use kernel_memory_addresses::sim::SimulatedRam;
use kernel_memory_addresses::{FrameNumber, PhysicalAddress, VirtualAddress};
use kernel_registers::{ControlRegisters, SimulatedRegisters};
use kernel_vmem::self_map::table_entry_address;
use kernel_vmem::{FaultOutcome, PageTable, Paging, PagingError, RegionArbiter, TrapFrame};

/// 64 KiB shared, kernel pool at frames 16..48, process pool at 64..128.
const LAYOUT: MemoryLayout = MemoryLayout {
    kernel_pool: FrameRange::new(16, 32),
    process_pool: FrameRange::new(64, 64),
    memory_hole: None,
    shared_size: 0x1_0000,
};

const NOT_PRESENT_WRITE: u32 = 0b010;
const PROTECTION_WRITE: u32 = 0b011;

struct Machine {
    ram: SimulatedRam,
    regs: SimulatedRegisters,
    frames: FramePoolRegistry,
    pools: BootPools,
}

impl Machine {
    fn new() -> Self {
        // Every untouched byte reads 0xFF, so uninitialized entries look present.
        let ram = SimulatedRam::with_fill(FrameNumber::new(0), 128, 0xFF);
        let mut frames = FramePoolRegistry::new();
        let pools = unsafe { bring_up(&mut frames, &ram, &LAYOUT) }.unwrap();
        Self {
            ram,
            regs: SimulatedRegisters::new(),
            frames,
            pools,
        }
    }

    fn paging(&self) -> Paging<'_, SimulatedRam, SimulatedRegisters> {
        Paging::init_paging(
            &self.ram,
            &self.regs,
            &self.frames,
            self.pools.kernel,
            self.pools.process,
            LAYOUT.shared_size,
        )
        .unwrap()
    }

    fn free(&self, pool: PoolId) -> u32 {
        self.frames.free_count(pool).unwrap()
    }
}

/// Accepts `[start, end)`.
struct Span(u32, u32);

impl RegionArbiter for Span {
    fn is_legitimate(&self, address: VirtualAddress) -> bool {
        (self.0..self.1).contains(&address.as_u32())
    }
}

const REGION: Span = Span(0x0040_0000, 0x0080_0000);

type Table<'a> = PageTable<'a, SimulatedRam, SimulatedRegisters>;

fn activate(table: &Table<'_>) {
    unsafe {
        table.load();
        table.enable_paging().unwrap();
    }
}

fn fault(table: &Table<'_>, va: u32, code: u32) -> Result<FaultOutcome, PagingError> {
    table
        .paging()
        .registers()
        .latch_fault_address(VirtualAddress::new(va));
    table.handle_fault(&TrapFrame::new(code))
}

fn pa(v: u32) -> Option<PhysicalAddress> {
    Some(PhysicalAddress::new(v))
}

#[test]
fn new_table_maps_shared_region_and_itself() {
    let m = Machine::new();
    let paging = m.paging();
    let kernel_before = m.free(m.pools.kernel);

    let table = PageTable::new(&paging).unwrap();
    assert_eq!(m.free(m.pools.kernel), kernel_before - 2);
    assert_eq!(table.directory_frame(), FrameNumber::new(18));

    assert_eq!(table.translate(VirtualAddress::new(0x3123)), pa(0x3123));
    assert_eq!(table.translate(VirtualAddress::new(0xFFFF)), pa(0xFFFF));
    assert_eq!(table.translate(VirtualAddress::new(0x1_0000)), None);
    assert_eq!(table.translate(VirtualAddress::new(0x0040_0000)), None);

    // Directory through slot 1023 twice, the shared table through it once.
    assert_eq!(table.translate(VirtualAddress::new(0xFFFF_F000)), pa(0x1_2000));
    assert_eq!(table.translate(VirtualAddress::new(0xFFC0_0000)), pa(0x1_3000));
}

#[test]
fn load_and_enable_switch_the_registers() {
    let m = Machine::new();
    let paging = m.paging();
    let table = PageTable::new(&paging).unwrap();
    assert!(!table.is_loaded());

    activate(&table);
    assert!(table.is_loaded());
    assert!(paging.paging_enabled());
    assert_eq!(m.regs.cr3().directory_frame(), table.directory_frame());
    assert_eq!(paging.mmu().translate(VirtualAddress::new(0x2000)), pa(0x2000));
}

#[test]
fn enable_without_loaded_table_is_refused() {
    let m = Machine::new();
    let paging = m.paging();
    assert_eq!(unsafe { paging.enable_paging() }, Err(PagingError::NoActiveTable));
    assert!(!paging.paging_enabled());
}

#[test]
fn first_fault_in_region_installs_table_and_page() {
    let m = Machine::new();
    let paging = m.paging();
    let table = PageTable::new(&paging).unwrap();
    table.register_pool(&REGION).unwrap();
    activate(&table);

    let (kernel, process) = (m.free(m.pools.kernel), m.free(m.pools.process));
    let outcome = fault(&table, 0x0040_0010, NOT_PRESENT_WRITE).unwrap();
    assert_eq!(
        outcome,
        FaultOutcome::Resolved {
            address: VirtualAddress::new(0x0040_0010),
            table_frame: Some(FrameNumber::new(20)),
            data_frame: Some(FrameNumber::new(64)),
        }
    );
    assert_eq!(m.free(m.pools.kernel), kernel - 1);
    assert_eq!(m.free(m.pools.process), process - 1);
    assert_eq!(table.translate(VirtualAddress::new(0x0040_0010)), pa(0x4_0010));

    // The new table was cleared: its other entries are not present.
    assert_eq!(table.translate(VirtualAddress::new(0x0040_1000)), None);
    assert_eq!(table.translate(VirtualAddress::new(0x007F_F000)), None);

    // Its entries are reachable through the self-map.
    let pte = table_entry_address(VirtualAddress::new(0x0040_0000));
    assert_eq!(table.translate(pte), pa(0x1_4000));
}

#[test]
fn second_fault_in_same_table_only_adds_a_page() {
    let m = Machine::new();
    let paging = m.paging();
    let table = PageTable::new(&paging).unwrap();
    table.register_pool(&REGION).unwrap();
    activate(&table);

    fault(&table, 0x0040_0000, NOT_PRESENT_WRITE).unwrap();
    let outcome = fault(&table, 0x0040_1234, NOT_PRESENT_WRITE).unwrap();
    assert_eq!(
        outcome,
        FaultOutcome::Resolved {
            address: VirtualAddress::new(0x0040_1234),
            table_frame: None,
            data_frame: Some(FrameNumber::new(65)),
        }
    );
    assert_eq!(table.translate(VirtualAddress::new(0x0040_1234)), pa(0x4_1234));
}

#[test]
fn protection_faults_are_ignored() {
    let m = Machine::new();
    let paging = m.paging();
    let table = PageTable::new(&paging).unwrap();
    table.register_pool(&REGION).unwrap();
    activate(&table);

    let process = m.free(m.pools.process);
    let outcome = fault(&table, 0x0040_0000, PROTECTION_WRITE).unwrap();
    assert_eq!(
        outcome,
        FaultOutcome::ProtectionViolationIgnored {
            address: VirtualAddress::new(0x0040_0000)
        }
    );
    assert_eq!(m.free(m.pools.process), process);
    assert_eq!(table.translate(VirtualAddress::new(0x0040_0000)), None);
}

#[test]
fn faults_outside_every_region_are_segmentation_faults() {
    let m = Machine::new();
    let paging = m.paging();
    let table = PageTable::new(&paging).unwrap();
    table.register_pool(&REGION).unwrap();
    activate(&table);

    let (kernel, process) = (m.free(m.pools.kernel), m.free(m.pools.process));
    let err = fault(&table, 0x0100_0000, NOT_PRESENT_WRITE).unwrap_err();
    assert_eq!(
        err,
        PagingError::SegmentationFault {
            address: VirtualAddress::new(0x0100_0000)
        }
    );
    assert_eq!(err.class(), ErrorClass::ProtocolViolation);
    assert_eq!(m.free(m.pools.kernel), kernel);
    assert_eq!(m.free(m.pools.process), process);
}

#[test]
fn faults_need_an_active_table() {
    let m = Machine::new();
    let paging = m.paging();
    let first = PageTable::new(&paging).unwrap();
    let second = PageTable::new(&paging).unwrap();
    first.register_pool(&REGION).unwrap();
    second.register_pool(&REGION).unwrap();

    unsafe { first.load() };
    assert_eq!(
        fault(&first, 0x0040_0000, NOT_PRESENT_WRITE),
        Err(PagingError::PagingDisabled)
    );

    unsafe { first.enable_paging() }.unwrap();
    assert_eq!(
        fault(&second, 0x0040_0000, NOT_PRESENT_WRITE),
        Err(PagingError::InactiveTable {
            table: second.directory_frame(),
            active: first.directory_frame(),
        })
    );
}

#[test]
fn exhausted_process_pool_is_reported() {
    let m = Machine::new();
    let paging = m.paging();
    let table = PageTable::new(&paging).unwrap();
    table.register_pool(&REGION).unwrap();
    activate(&table);

    let all = m.free(m.pools.process);
    m.frames.get_frames(m.pools.process, all).unwrap();

    let err = fault(&table, 0x0040_0000, NOT_PRESENT_WRITE).unwrap_err();
    assert_eq!(
        err,
        PagingError::Frames(FrameError::InsufficientFrames {
            requested: 1,
            free: 0
        })
    );
    assert_eq!(err.class(), ErrorClass::Exhaustion);
}

#[test]
fn failed_construction_returns_the_directory_frame() {
    let m = Machine::new();
    let paging = m.paging();
    let spare = m.free(m.pools.kernel) - 1;
    m.frames.get_frames(m.pools.kernel, spare).unwrap();
    assert_eq!(m.free(m.pools.kernel), 1);

    let err = PageTable::new(&paging).unwrap_err();
    assert!(matches!(
        err,
        PagingError::Frames(FrameError::InsufficientFrames { .. })
    ));
    assert_eq!(m.free(m.pools.kernel), 1);
}

#[test]
fn free_page_releases_the_frame_and_flushes() {
    let m = Machine::new();
    let paging = m.paging();
    let table = PageTable::new(&paging).unwrap();
    table.register_pool(&REGION).unwrap();
    activate(&table);

    fault(&table, 0x0040_0000, NOT_PRESENT_WRITE).unwrap();
    let process = m.free(m.pools.process);
    let writes = m.regs.cr3_writes();

    assert_eq!(
        table.free_page(VirtualAddress::new(0x0040_0000)),
        Ok(Some(FrameNumber::new(64)))
    );
    assert_eq!(m.free(m.pools.process), process + 1);
    assert_eq!(table.translate(VirtualAddress::new(0x0040_0000)), None);
    assert_eq!(m.regs.cr3_writes(), writes + 1);

    // Unmapped page, and a page whose table does not exist: no-op, still flushed.
    assert_eq!(table.free_page(VirtualAddress::new(0x0040_0000)), Ok(None));
    assert_eq!(table.free_page(VirtualAddress::new(0x0080_0000)), Ok(None));
    assert_eq!(m.regs.cr3_writes(), writes + 3);

    // Touching it again maps a fresh frame.
    let again = fault(&table, 0x0040_0000, NOT_PRESENT_WRITE).unwrap();
    assert!(matches!(
        again,
        FaultOutcome::Resolved {
            table_frame: None,
            data_frame: Some(_),
            ..
        }
    ));
}

#[test]
fn freeing_a_shared_page_is_rejected() {
    let m = Machine::new();
    let paging = m.paging();
    let table = PageTable::new(&paging).unwrap();
    activate(&table);
    let cr3_writes = m.regs.cr3_writes();

    let page = VirtualAddress::new(0x1000);
    let err = table.free_page(page).unwrap_err();
    assert_eq!(err, PagingError::SharedPage { address: page });
    assert_eq!(err.class(), ErrorClass::ProtocolViolation);
    assert_eq!(table.translate(page), pa(0x1000));
    assert_eq!(m.regs.cr3_writes(), cr3_writes);
}

#[test]
fn shared_region_over_a_pool_keeps_its_frames() {
    let m = Machine::new();
    // 256 KiB shared: frames 16 and 17 are the pools' bitmaps.
    let paging = Paging::init_paging(
        &m.ram,
        &m.regs,
        &m.frames,
        m.pools.kernel,
        m.pools.process,
        0x4_0000,
    )
    .unwrap();
    let low = Span(0x4_0000, 0x8_0000);
    let table = PageTable::new(&paging).unwrap();
    activate(&table);
    let kernel = m.free(m.pools.kernel);

    let bitmap = VirtualAddress::new(0x1_1000);
    assert_eq!(
        table.free_page(bitmap),
        Err(PagingError::SharedPage { address: bitmap })
    );
    assert_eq!(m.frames.state(FrameNumber::new(17)), Some(FrameState::HeadOfSequence));
    assert_eq!(m.free(m.pools.kernel), kernel);
    assert_eq!(table.translate(bitmap), pa(0x1_1000));

    // The first frame past the shared region is demand-paged as usual.
    table.register_pool(&low).unwrap();
    let outcome = fault(&table, 0x4_0000, NOT_PRESENT_WRITE).unwrap();
    assert!(matches!(outcome, FaultOutcome::Resolved { .. }));
    assert!(table.free_page(VirtualAddress::new(0x4_0000)).unwrap().is_some());
}

#[test]
fn region_pool_list_is_bounded() {
    let m = Machine::new();
    let paging = m.paging();
    let span = Span(0, 0);
    let table = PageTable::new(&paging).unwrap();
    for _ in 0..kernel_vmem::MAX_REGION_POOLS {
        table.register_pool(&span).unwrap();
    }
    assert_eq!(
        table.register_pool(&span),
        Err(PagingError::PoolRegistryFull { capacity: 512 })
    );
    assert_eq!(table.registered_pools(), 512);
}

#[test]
fn shared_size_is_validated() {
    let m = Machine::new();
    for size in [0x1001, 0x0040_1000] {
        let err = Paging::init_paging(&m.ram, &m.regs, &m.frames, m.pools.kernel, m.pools.process, size)
            .err();
        assert_eq!(err, Some(PagingError::InvalidSharedSize { size }));
    }
}
