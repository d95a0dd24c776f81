//! Static dashboard page
//!
//! Everything the page needs ships in this one document; it polls
//! `/api/stats` and `/api/logs` and renders client-side, so the server
//! never templates anything.

pub const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Sighting Bot Dashboard</title>
<style>
  :root {
    --bg: #0d1117;
    --panel: #161b22;
    --border: #30363d;
    --text: #e6edf3;
    --muted: #8b949e;
    --accent: #58a6ff;
    --ok: #3fb950;
    --bad: #f85149;
  }
  * { box-sizing: border-box; margin: 0; padding: 0; }
  body {
    background: var(--bg);
    color: var(--text);
    font-family: -apple-system, "Segoe UI", Roboto, sans-serif;
    padding: 24px;
  }
  h1 { font-size: 1.3rem; margin-bottom: 4px; }
  .subtitle { color: var(--muted); font-size: 0.85rem; margin-bottom: 20px; }
  .cards {
    display: grid;
    grid-template-columns: repeat(auto-fit, minmax(150px, 1fr));
    gap: 12px;
    margin-bottom: 20px;
  }
  .card {
    background: var(--panel);
    border: 1px solid var(--border);
    border-radius: 8px;
    padding: 14px;
  }
  .card .label { color: var(--muted); font-size: 0.75rem; text-transform: uppercase; }
  .card .value { font-size: 1.5rem; margin-top: 6px; }
  .status-ok { color: var(--ok); }
  .status-bad { color: var(--bad); }
  .logs {
    background: var(--panel);
    border: 1px solid var(--border);
    border-radius: 8px;
    padding: 14px;
    font-family: ui-monospace, "SF Mono", Menlo, monospace;
    font-size: 0.8rem;
    max-height: 320px;
    overflow-y: auto;
  }
  .logs h2 { font-size: 0.9rem; margin-bottom: 10px; font-family: inherit; }
  .log-line { padding: 2px 0; color: var(--muted); }
  .log-line .level-INFO { color: var(--accent); }
  .log-line .level-WARN { color: #d29922; }
  .log-line .level-ERROR { color: var(--bad); }
</style>
</head>
<body>
<h1>Sighting Bot</h1>
<div class="subtitle">live statistics, refreshed every 5 seconds</div>

<div class="cards">
  <div class="card"><div class="label">Status</div><div class="value" id="status">—</div></div>
  <div class="card"><div class="label">Latency</div><div class="value" id="latency">—</div></div>
  <div class="card"><div class="label">Uptime</div><div class="value" id="uptime">—</div></div>
  <div class="card"><div class="label">Guilds</div><div class="value" id="guilds">—</div></div>
  <div class="card"><div class="label">Users</div><div class="value" id="users">—</div></div>
  <div class="card"><div class="label">Reactions</div><div class="value" id="reactions">—</div></div>
  <div class="card"><div class="label">Open Tickets</div><div class="value" id="tickets">—</div></div>
  <div class="card"><div class="label">Admins</div><div class="value" id="admins">—</div></div>
</div>

<div class="logs">
  <h2>Recent activity</h2>
  <div id="log-lines"><div class="log-line">waiting for data…</div></div>
</div>

<script>
function formatUptime(seconds) {
  const h = Math.floor(seconds / 3600);
  const m = Math.floor((seconds % 3600) / 60);
  const s = seconds % 60;
  return h > 0 ? `${h}h ${m}m` : m > 0 ? `${m}m ${s}s` : `${s}s`;
}

async function refreshStats() {
  try {
    const stats = await (await fetch('/api/stats')).json();
    const status = document.getElementById('status');
    status.textContent = stats.online ? 'Online' : 'Offline';
    status.className = 'value ' + (stats.online ? 'status-ok' : 'status-bad');
    document.getElementById('latency').textContent = stats.latencyMs.toFixed(1) + ' ms';
    document.getElementById('uptime').textContent = formatUptime(stats.uptimeSeconds);
    document.getElementById('guilds').textContent = stats.guilds;
    document.getElementById('users').textContent = stats.users;
    document.getElementById('reactions').textContent = stats.totalReactions;
    document.getElementById('tickets').textContent = stats.openTickets;
    document.getElementById('admins').textContent = stats.authorizedUsers;
  } catch (e) {
    const status = document.getElementById('status');
    status.textContent = 'Unreachable';
    status.className = 'value status-bad';
  }
}

async function refreshLogs() {
  try {
    const logs = await (await fetch('/api/logs')).json();
    if (logs.length === 0) return;
    const container = document.getElementById('log-lines');
    container.innerHTML = '';
    for (const entry of logs) {
      const line = document.createElement('div');
      line.className = 'log-line';
      const level = document.createElement('span');
      level.className = 'level-' + entry.level;
      level.textContent = entry.level;
      line.append(entry.time + ' ', level, ' ' + entry.message);
      container.appendChild(line);
    }
    container.scrollTop = container.scrollHeight;
  } catch (e) {
    // keep the last tail on a transient failure
  }
}

function refresh() {
  refreshStats();
  refreshLogs();
}

refresh();
setInterval(refresh, 5000);
</script>
</body>
</html>
"#;
