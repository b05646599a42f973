//! Timed I/O against simulated circuits

mod common;

use std::time::{Duration, Instant};

use cogline_core::{Error, Unit};
use cogline_drivers::sim::{ClockSource, PulseSource, RcDecay, ShiftEcho};
use cogline_hal::{BitOrder, Direction, Level, LineIo, ShiftInMode, TickClock};

use common::{line, runtime};

#[test]
fn test_shift_round_trip() {
    let (board, cog) = runtime();
    let (data, clock) = (line(10), line(11));
    board.attach(ShiftEcho::new(data, clock));

    cog.shift_out(data, clock, BitOrder::MsbFirst, 8, 0xA5).unwrap();
    let value = cog.shift_in(data, clock, ShiftInMode::MsbPre, 8).unwrap();
    assert_eq!(value, 0xA5);
    assert_eq!(board.direction(data), Direction::Input);
    assert_eq!(board.output(clock), Level::Low);
}

#[test]
fn test_shift_lsb_first_wide_word() {
    let (board, cog) = runtime();
    let (data, clock) = (line(2), line(3));
    board.attach(ShiftEcho::new(data, clock));

    cog.shift_out(data, clock, BitOrder::LsbFirst, 20, 0xF_0A5C)
        .unwrap();
    let value = cog.shift_in(data, clock, ShiftInMode::LsbPre, 20).unwrap();
    assert_eq!(value, 0xF_0A5C);
}

#[test]
fn test_shift_rejects_bad_arguments() {
    let (_board, cog) = runtime();
    assert_eq!(
        cog.shift_out(line(1), line(1), BitOrder::MsbFirst, 8, 0),
        Err(Error::InvalidArgument)
    );
    assert_eq!(
        cog.shift_in(line(1), line(2), ShiftInMode::MsbPost, 33),
        Err(Error::InvalidArgument)
    );
    assert_eq!(
        cog.shift_in(line(1), line(2), ShiftInMode::MsbPost, 0),
        Err(Error::InvalidArgument)
    );
}

#[test]
fn test_shift_post_mode_reads_after_edge() {
    let (board, cog) = runtime();
    let (data, clock) = (line(4), line(5));
    // Post sampling sees each bit only after the clock moved past it
    board.attach(ShiftEcho::with_bits(
        data,
        clock,
        [false, true, true, false, true],
    ));
    let value = cog.shift_in(data, clock, ShiftInMode::MsbPost, 4).unwrap();
    assert_eq!(value, 0b1101);
}

#[test]
fn test_pulse_in_measures_width() {
    let (board, cog) = runtime();
    let input = line(7);
    let ms = board.ticks_per_ms();
    board.attach(PulseSource::new(
        input,
        Level::High,
        board.ticks(),
        ms / 2,
        Some(ms * 2),
    ));

    let width = cog.pulse_in(input, Level::High).unwrap();
    assert!((450..=600).contains(&width), "width {width}");
}

#[test]
fn test_pulse_in_low_polarity() {
    let (board, cog) = runtime();
    let input = line(8);
    let ms = board.ticks_per_ms();
    board.attach(PulseSource::new(
        input,
        Level::Low,
        board.ticks().wrapping_add(ms),
        ms,
        None,
    ));

    let width = cog.pulse_in(input, Level::Low).unwrap();
    assert!((950..=1_100).contains(&width), "width {width}");
}

#[test]
fn test_pulse_in_timeout_is_bounded() {
    let (board, cog) = runtime();
    cog.time().set_io_timeout(board.ticks_per_ms() * 20);

    let start = Instant::now();
    assert_eq!(cog.pulse_in(line(9), Level::High), Err(Error::Timeout));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(20));
    assert!(elapsed < Duration::from_millis(200), "took {elapsed:?}");

    // the convenience surface reports a timeout as zero
    assert_eq!(cog.simple().pulse_in(9, 1), Ok(0));
}

#[test]
fn test_pulse_out_restores_output() {
    let (board, cog) = runtime();
    let out = line(13);
    board.low(out);

    let start = Instant::now();
    cog.pulse_out(out, 2_000).unwrap();
    assert!(start.elapsed() >= Duration::from_millis(2));
    assert_eq!(board.output(out), Level::Low);
    assert_eq!(board.direction(out), Direction::Output);
}

#[test]
fn test_rc_time_tracks_decay() {
    let (board, cog) = runtime();
    let probe = line(15);
    board.attach(RcDecay::new(probe, board.ticks_per_ms() * 3));

    let units = cog.rc_time(probe, Level::High).unwrap();
    assert!((2_900..=3_300).contains(&units), "units {units}");
    assert_eq!(board.direction(probe), Direction::Input);
}

#[test]
fn test_rc_time_timeout() {
    let (board, cog) = runtime();
    let probe = line(16);
    board.attach(RcDecay::new(probe, board.ticks_per_second()));
    cog.time().set_io_timeout(board.ticks_per_ms() * 10);

    assert_eq!(cog.rc_time(probe, Level::High), Err(Error::Timeout));
}

#[test]
fn test_count_transitions() {
    let (board, cog) = runtime();
    let input = line(17);
    // 1 kHz
    board.attach(ClockSource::new(input, board.ticks_per_ms() / 2, board.ticks()));

    let rising = cog.count_transitions(input, 20_000).unwrap();
    assert!((19..=21).contains(&rising), "rising {rising}");
}

#[test]
fn test_count_unit_scales_duration() {
    let (board, cog) = runtime();
    let input = line(18);
    board.attach(ClockSource::new(input, board.ticks_per_ms() / 2, board.ticks()));
    cog.time().set_count_unit(board.ticks_per_ms()).unwrap();

    let start = Instant::now();
    let rising = cog.count_transitions(input, 10).unwrap();
    assert!(start.elapsed() >= Duration::from_millis(10));
    assert!((9..=11).contains(&rising), "rising {rising}");
}

#[test]
fn test_timed_io_refuses_claimed_line() {
    let (_board, cog) = runtime();
    cog.start_pwm(1_000).unwrap();
    cog.pwm().set_channel(0, Some(line(21)), 10).unwrap();

    assert_eq!(cog.pulse_in(line(21), Level::High), Err(Error::AlreadyClaimed));
    assert_eq!(cog.rc_time(line(21), Level::High), Err(Error::AlreadyClaimed));
    assert_eq!(cog.count_transitions(line(21), 10), Err(Error::AlreadyClaimed));
    assert_eq!(
        cog.shift_out(line(22), line(21), BitOrder::MsbFirst, 8, 1),
        Err(Error::AlreadyClaimed)
    );
    assert_eq!(cog.freqout(line(21), 1, 1_000), Err(Error::AlreadyClaimed));
}

#[test]
fn test_wait_keeps_even_spacing() {
    let (_board, cog) = runtime();
    cog.mark();
    let origin = cog.time().marked();

    cog.wait(10_000);
    cog.wait(10_000);
    assert_eq!(cog.time().marked(), origin.wrapping_add(1_600_000));
    assert!(cog.elapsed_since_mark(Unit::Io) < 10_000);
}

#[test]
fn test_wait_reanchors_after_overrun() {
    let (board, cog) = runtime();
    cog.mark();
    std::thread::sleep(Duration::from_millis(30));

    cog.wait(5_000);
    let marked = cog.time().marked();
    let since = board.ticks().wrapping_sub(marked);
    assert!(since < board.ticks_per_ms() * 5, "mark is {since} ticks old");
}

#[test]
fn test_timeout_and_pause() {
    let (_board, cog) = runtime();
    cog.mark();
    assert!(!cog.timeout(50_000));
    cog.pause(5);
    assert!(cog.timeout(5_000));

    let io = cog.simple();
    io.mark();
    assert_eq!(io.timeout(1_000_000), 0);
}

#[test]
fn test_simple_register_calls() {
    let (board, cog) = runtime();
    let io = cog.simple();

    io.high(0).unwrap();
    assert_eq!(io.get_state(0), Ok(1));
    assert_eq!(io.toggle(0), Ok(0));
    assert_eq!(io.get_output(0), Ok(0));
    assert_eq!(io.reverse(0), Ok(0));
    assert_eq!(io.get_direction(0), Ok(0));

    io.set_directions(7, 4, 0b1011).unwrap();
    assert_eq!(io.get_directions(7, 4), Ok(0b1011));
    io.set_outputs(7, 4, 0b0011).unwrap();
    assert_eq!(io.get_states(7, 4), Ok(0b0011));
    assert_eq!(io.get_outputs(7, 4), Ok(0b0011));
    assert_eq!(io.get_outputs(7, 7), Ok(0));
    assert_eq!(board.level(line(4)), Level::High);

    assert_eq!(io.high(32), Err(Error::InvalidArgument));
    assert_eq!(io.input(-1), Err(Error::InvalidArgument));
}
